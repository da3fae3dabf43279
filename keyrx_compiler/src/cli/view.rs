//! `view` subcommand: render a compiled keymap as an HTML page listing every
//! key, its keysyms per level, and the action kind the compat compiler
//! resolved for it.

use std::fs;
use std::path::Path;

use keyrx_core::domain::aggregates::Keymap;
use keyrx_core::domain::entities::{Action, Key};

use crate::artifact;
use crate::compile_text;
use crate::error::{SourceError, ViewError};

/// Reads a `.krx` artifact at `input`, re-derives its `Keymap`, and writes
/// an HTML visualization to `output`. With `open`, also launches it in the
/// system browser.
pub fn handle_view(input: &Path, output: &Path, open: bool) -> Result<(), ViewError> {
    let bytes = fs::read(input).map_err(|source| SourceError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let decoded = artifact::decode(&bytes)?;
    let (keymap, _) = compile_text(&decoded.text)?;

    let html = render_html(input, &keymap);
    fs::write(output, &html).map_err(|source| SourceError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    println!("Generated: {}", output.display());

    if open {
        if let Err(e) = ::open::that(output) {
            eprintln!("Could not open browser: {}", e);
        }
    }

    Ok(())
}

/// The CSS class a key's first level's action buckets into, for the legend
/// and border color in the rendered page.
fn action_class(action: &Action) -> &'static str {
    match action {
        Action::None | Action::Terminate | Action::Private(_) => "simple",
        Action::ModLock(_) | Action::GroupLock(_) | Action::CtrlLock(_) | Action::PtrLock(_) => {
            "lock"
        }
        Action::ModLatch(_) | Action::GroupLatch(_) => "latch",
        _ => "modifier",
    }
}

fn key_label(keymap: &Keymap, key: &Key) -> String {
    key.groups
        .first()
        .and_then(|g| g.levels.first())
        .map(|level| {
            level
                .syms
                .first()
                .map(|sym| sym.name())
                .unwrap_or_default()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| keymap.atoms.text(key.name).unwrap_or("?").to_string())
}

fn render_html(input: &Path, keymap: &Keymap) -> String {
    let mut keys: Vec<&Key> = keymap.keys.iter().collect();
    keys.sort_by_key(|k| k.keycode);

    let mut rows = String::new();
    for key in &keys {
        let name = keymap.atoms.text(key.name).unwrap_or("?");
        let action = key
            .groups
            .first()
            .and_then(|g| g.levels.first())
            .map(|l| l.action)
            .unwrap_or_default();
        let class = action_class(&action);
        let label = key_label(keymap, key);
        rows.push_str(&format!(
            r#"<div class="key {class}" data-keycode="{keycode}">
    <span class="original">&lt;{name}&gt; ({keycode})</span>
    <span class="remap">{label}</span>
</div>
"#,
            class = class,
            keycode = key.keycode,
            name = name,
            label = label,
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>KeyRx Layout: {title}</title>
<style>
* {{ box-sizing: border-box; }}
body {{
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    margin: 0;
    padding: 20px;
    background: #1a1a2e;
    color: #eee;
}}
h1 {{ color: #00d9ff; margin-bottom: 5px; }}
.source {{ color: #888; font-size: 0.9em; margin-bottom: 20px; }}
.legend {{ display: flex; gap: 15px; flex-wrap: wrap; margin: 15px 0; font-size: 0.85em; }}
.legend-item {{ display: flex; align-items: center; gap: 6px; }}
.legend-color {{ width: 16px; height: 16px; border-radius: 3px; }}
.keys {{
    display: flex;
    flex-wrap: wrap;
    gap: 6px;
    background: #16213e;
    padding: 15px;
    border-radius: 10px;
    box-shadow: 0 4px 20px rgba(0,0,0,0.3);
}}
.key {{
    width: 110px;
    height: 50px;
    background: #2d3a5a;
    border-radius: 5px;
    display: flex;
    flex-direction: column;
    align-items: center;
    justify-content: center;
    font-size: 11px;
    border: 1px solid #3d4a6a;
}}
.key .original {{ color: #888; font-size: 10px; }}
.key .remap {{ color: #ffd93d; font-weight: bold; font-size: 12px; min-height: 14px; }}
.key.simple {{ border-color: #4ade80; }}
.key.modifier {{ border-color: #00d9ff; background: rgba(0, 217, 255, 0.15); }}
.key.lock {{ border-color: #a78bfa; background: rgba(167, 139, 250, 0.15); }}
.key.latch {{ border-color: #ff6b6b; background: rgba(255, 107, 107, 0.15); }}
</style>
</head>
<body>
<h1>KeyRx Layout Viewer</h1>
<p class="source">Source: <code>{source}</code></p>
<div class="legend">
    <div class="legend-item"><div class="legend-color" style="background: #4ade80;"></div> Plain symbol</div>
    <div class="legend-item"><div class="legend-color" style="background: #00d9ff;"></div> Modifier set</div>
    <div class="legend-item"><div class="legend-color" style="background: #a78bfa;"></div> Lock</div>
    <div class="legend-item"><div class="legend-color" style="background: #ff6b6b;"></div> Latch</div>
</div>
<div class="keys">
{rows}</div>
</body>
</html>
"#,
        title = input.file_name().unwrap_or_default().to_string_lossy(),
        source = input.display(),
        rows = rows,
    )
}
