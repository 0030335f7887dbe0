use std::path::PathBuf;

/// Asks the user where a file should be saved.
pub trait SavePathPrompt {
    /// Returns the chosen path, or `None` if the user cancelled.
    fn choose_save_path(&self, title: &str, suggested_name: &str) -> Option<PathBuf>;
}

/// Shows the platform's native "Save as" dialog.
#[derive(Clone, Copy, Debug, Default)]
pub struct DialogSavePrompt;

impl SavePathPrompt for DialogSavePrompt {
    fn choose_save_path(&self, title: &str, suggested_name: &str) -> Option<PathBuf> {
        rfd::FileDialog::new()
            .set_title(title)
            .set_file_name(suggested_name)
            .save_file()
    }
}

/// Always answers with the same path (or always cancels if there is none).
///
/// Used by the command-line host, where the destination is given up front.
#[derive(Clone, Debug, Default)]
pub struct FixedSavePath(pub Option<PathBuf>);

impl SavePathPrompt for FixedSavePath {
    fn choose_save_path(&self, _title: &str, _suggested_name: &str) -> Option<PathBuf> {
        self.0.clone()
    }
}

/// Returns a file name derived from an attachment's caption that is safe to suggest
/// in a "Save as" dialog.
pub fn suggested_file_name(caption: &str) -> String {
    let sanitized = sanitize_filename::sanitize(caption.trim());
    if sanitized.is_empty() {
        String::from("image")
    } else {
        sanitized
    }
}
