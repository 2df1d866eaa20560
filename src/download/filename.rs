//! Target path computation for downloaded assets.
//!
//! Filenames come from a user template with `{id}`, `{name}` and `{ext}`
//! placeholders. Rendering never fails from the caller's point of view: a
//! template that cannot be rendered falls back to a fixed naming scheme so
//! no asset is ever dropped.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use url::Url;

use super::constants::FALLBACK_EXTENSION;
use crate::resolver::AssetDescriptor;

/// Reasons a filename template could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// Placeholder other than `id`, `name` or `ext`.
    #[error("unknown placeholder {{{0}}}")]
    UnknownField(String),

    /// Format spec the placeholder does not support.
    #[error("unsupported format spec '{spec}' for {{{field}}}")]
    InvalidSpec {
        /// Placeholder name.
        field: String,
        /// The offending spec.
        spec: String,
    },

    /// `{` or `}` without a partner.
    #[error("unbalanced brace in filename format")]
    UnbalancedBrace,

    /// Rendered name is empty or would escape the page directory.
    #[error("rendered filename '{0}' is not a plain file name")]
    UnsafeName(String),
}

/// Where one asset is written: `root / page_id / filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTarget {
    /// Page directory.
    pub directory: PathBuf,
    /// Rendered file name inside `directory`.
    pub filename: String,
}

impl WriteTarget {
    /// Computes the target for `asset` under `root/page_id`.
    #[must_use]
    pub fn compute(root: &Path, page_id: &str, asset: &AssetDescriptor, format: &str) -> Self {
        let ext = asset_extension(asset);
        let base = sanitize_component(file_stem(basename(&asset.name)));
        let filename = match render_filename(format, asset.id, &base, &ext) {
            Ok(name) => name,
            Err(e) => {
                debug!(format, asset_id = asset.id, error = %e, "filename format failed; using fallback");
                fallback_filename(asset, &ext)
            }
        };
        Self {
            directory: root.join(page_id),
            filename,
        }
    }

    /// Full path of the target file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

/// Renders a filename template.
///
/// Supported placeholders: `{id}` with an optional integer spec such as
/// `{id:03d}`, `{name}` and `{ext}` (optionally `:s`). `{{` and `}}` are
/// literal braces.
///
/// # Errors
///
/// Returns [`RenderError`] for unknown placeholders, unsupported specs,
/// unbalanced braces, or a result that is not a plain file name.
///
/// # Example
///
/// ```
/// use telegrab_core::render_filename;
///
/// let name = render_filename("{id:03d}_{name}{ext}", 7, "cat", ".jpg").unwrap();
/// assert_eq!(name, "007_cat.jpg");
/// ```
pub fn render_filename(
    format: &str,
    id: usize,
    name: &str,
    ext: &str,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(format.len() + name.len() + ext.len());
    let mut chars = format.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut placeholder = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => return Err(RenderError::UnbalancedBrace),
                        c => placeholder.push(c),
                    }
                }
                if !closed {
                    return Err(RenderError::UnbalancedBrace);
                }
                let (field, spec) = placeholder
                    .split_once(':')
                    .unwrap_or((placeholder.as_str(), ""));
                match field {
                    "id" => out.push_str(&format_integer(id, spec)?),
                    "name" => out.push_str(string_field("name", name, spec)?),
                    "ext" => out.push_str(string_field("ext", ext, spec)?),
                    other => return Err(RenderError::UnknownField(other.to_string())),
                }
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(RenderError::UnbalancedBrace),
            c => out.push(c),
        }
    }

    if is_plain_file_name(&out) {
        Ok(out)
    } else {
        Err(RenderError::UnsafeName(out))
    }
}

/// Widest padding accepted for `{id}`; a longer name cannot exist on disk anyway.
const MAX_PAD_WIDTH: usize = 255;

/// Integer spec subset: `[0][width][d]`.
fn format_integer(value: usize, spec: &str) -> Result<String, RenderError> {
    let invalid = || RenderError::InvalidSpec {
        field: "id".to_string(),
        spec: spec.to_string(),
    };
    let digits = spec.strip_suffix('d').unwrap_or(spec);
    if digits.is_empty() {
        return Ok(value.to_string());
    }
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let zero_pad = digits.starts_with('0');
    let width: usize = digits.parse().map_err(|_| invalid())?;
    if width > MAX_PAD_WIDTH {
        return Err(invalid());
    }
    Ok(if zero_pad {
        format!("{value:0width$}")
    } else {
        format!("{value:>width$}")
    })
}

fn string_field<'a>(field: &str, value: &'a str, spec: &str) -> Result<&'a str, RenderError> {
    if spec.is_empty() || spec == "s" {
        Ok(value)
    } else {
        Err(RenderError::InvalidSpec {
            field: field.to_string(),
            spec: spec.to_string(),
        })
    }
}

/// Naming used when the template cannot be rendered.
///
/// - name is itself a URL: `{id:03}{ext}`
/// - otherwise: `{id:03}_{sanitized name}`, or `{id:03}.jpg` when nothing survives sanitizing
#[must_use]
pub fn fallback_filename(asset: &AssetDescriptor, ext: &str) -> String {
    let id = asset.id;
    if asset.name.starts_with("http://") || asset.name.starts_with("https://") {
        let ext = if ext.is_empty() { FALLBACK_EXTENSION } else { ext };
        return format!("{id:03}{ext}");
    }
    let safe = sanitize_component(&asset.name);
    if safe.is_empty() || !is_plain_file_name(&safe) {
        format!("{id:03}{FALLBACK_EXTENSION}")
    } else {
        format!("{id:03}_{safe}")
    }
}

/// Removes characters that are invalid in file names on common filesystems:
/// `< > : " / \ | ? *` and control characters.
#[must_use]
pub fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect()
}

/// Extension of the asset name, else of its URL path, else `.jpg`.
#[must_use]
pub fn asset_extension(asset: &AssetDescriptor) -> String {
    extension_of(basename(&asset.name))
        .or_else(|| extension_from_url(&asset.url))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Last `/`-separated segment.
fn basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Splits at the last dot that is not part of a leading run of dots.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(pos) => {
            let pos = leading + pos;
            (&name[..pos], Some(&name[pos..]))
        }
        None => (name, None),
    }
}

fn file_stem(name: &str) -> &str {
    split_extension(name).0
}

fn extension_of(name: &str) -> Option<String> {
    split_extension(name).1.map(str::to_string)
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    extension_of(last_segment)
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains(['/', '\\'])
        && Path::new(name)
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}
