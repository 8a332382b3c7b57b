use anyhow::Result;
use std::path::PathBuf;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Export the ledger as JSON into the current directory.
pub fn export_ledger_json(state: &UiState) -> Result<PathBuf> {
    let path = crate::export::default_export_path("json")?;
    crate::export::export_json(&path, &state.ledger)?;
    Ok(path)
}

/// Export the ledger as CSV into the current directory.
pub fn export_ledger_csv(state: &UiState) -> Result<PathBuf> {
    let path = crate::export::default_export_path("csv")?;
    crate::export::export_csv(&path, &state.ledger)?;
    Ok(path)
}

/// Start the clipboard thread on first use. Each copy keeps its clipboard
/// handle alive for a moment so clipboard managers on Linux can read it.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            use arboard::Clipboard;
            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });
        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
