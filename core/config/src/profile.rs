//! Profile wire format.
//!
//! The external mount helper reads its configuration from standard input as a
//! sequence of `[name]` header lines each followed by `key = value` lines,
//! with a blank line between blocks. This module renders remote definitions
//! into that format and parses it back (the authorization flow's read-back
//! path).

use stratus_common::{Error, RemoteName, Result};

use crate::remote::RemoteDefinition;

/// Render a single remote definition as a profile block.
///
/// The `type` line always comes first, then the fields in insertion order.
pub(crate) fn render_block(def: &RemoteDefinition) -> String {
    let mut block = format!("[{}]\ntype = {}\n", def.name(), def.provider());
    for (key, value) in def.fields() {
        block.push_str(key);
        block.push_str(" = ");
        block.push_str(value);
        block.push('\n');
    }
    block
}

/// Render a full profile: all blocks, separated by a blank line.
pub fn render_profile(remotes: &[RemoteDefinition]) -> String {
    let blocks: Vec<String> = remotes.iter().map(render_block).collect();
    blocks.join("\n")
}

/// Parse profile text into remote definitions.
///
/// Accepts the helper's own on-disk profile syntax: `[name]` headers,
/// `key = value` lines (values kept verbatim, including any further `=`
/// characters), comment lines starting with `#` or `;`, and blank lines.
///
/// # Errors
/// - A `key = value` line appears before any `[name]` header
/// - A block header is not a valid remote name
/// - A block carries no `type` key
pub fn parse_profile(text: &str) -> Result<Vec<RemoteDefinition>> {
    struct Block {
        name: RemoteName,
        provider: Option<String>,
        fields: Vec<(String, String)>,
    }

    fn finish(block: Block, out: &mut Vec<RemoteDefinition>) -> Result<()> {
        let provider = block.provider.ok_or_else(|| {
            Error::Config(format!("Remote '{}' has no type", block.name))
        })?;
        out.push(RemoteDefinition::new(block.name, provider, block.fields));
        Ok(())
    }

    let mut remotes = Vec::new();
    let mut current: Option<Block> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            if let Some(block) = current.take() {
                finish(block, &mut remotes)?;
            }
            current = Some(Block {
                name: RemoteName::new(header)?,
                provider: None,
                fields: Vec::new(),
            });
            continue;
        }

        let block = current.as_mut().ok_or_else(|| {
            Error::Config(format!("Stray line outside any block: '{}'", line))
        })?;

        let (key, value) = line.split_once('=').ok_or_else(|| {
            Error::Config(format!("Malformed line in profile: '{}'", line))
        })?;
        let key = key.trim();
        let value = value.trim();

        if key == "type" {
            block.provider = Some(value.to_string());
        } else {
            block.fields.push((key.to_string(), value.to_string()));
        }
    }

    if let Some(block) = current.take() {
        finish(block, &mut remotes)?;
    }

    Ok(remotes)
}
