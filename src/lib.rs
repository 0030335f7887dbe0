use std::{path::Path, sync::OnceLock};

use directories::ProjectDirs;

pub mod app;
pub mod config;

/// The inline image item shown for `m.image` messages in a room timeline.
pub mod image_item;
/// The modal overlay that shows a full-resolution image.
pub mod image_overlay;
/// Decoding and scaling of downloaded images.
pub mod image_utils;
/// Geometry, font metrics, and the painter abstraction used for drawing.
pub mod paint;
/// Prompting the user for a destination path when saving media.
pub mod save_prompt;

// Matrix stuff
pub mod media_client;
pub mod link_opener;
pub mod client_bridge;
pub mod theme;

pub mod signal;

#[cfg(test)]
mod test_support;


pub const APP_QUALIFIER: &str = "org";
pub const APP_ORGANIZATION: &str = "inline-image";
pub const APP_NAME: &str = "inline-image";

/// Returns the project directories, or `None` if no valid home directory
/// could be found for the current user.
pub fn project_dir() -> Option<&'static ProjectDirs> {
    static PROJECT_DIRS: OnceLock<Option<ProjectDirs>> = OnceLock::new();

    PROJECT_DIRS.get_or_init(|| {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
    }).as_ref()
}

pub fn app_data_dir() -> Option<&'static Path> {
    project_dir().map(ProjectDirs::data_dir)
}
