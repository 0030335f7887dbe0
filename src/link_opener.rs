//! Opening links clicked anywhere in the app.
//!
//! Matrix links (`matrix.to` and `matrix:` URIs) are handed to the in-app
//! handler first. Everything else is only opened by the platform's default
//! handler if its scheme is in [`ALLOWED_URL_SCHEMES`].

use std::rc::Rc;

use ruma::{MatrixToUri, MatrixUri, OwnedServerName, matrix_uri::MatrixId};
use url::Url;

/// The URL schemes that may be opened by the platform's default handler.
pub const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Something that can navigate to a Matrix entity (room, user, event) inside the app.
pub trait MatrixUriHandler {
    /// Returns `true` if the link was handled in-app.
    fn handle_matrix_link(&self, id: &MatrixId, via: &[OwnedServerName]) -> bool;
}

/// Something that can open a URL outside of the app, e.g., in a web browser.
pub trait ExternalOpener {
    fn open(&self, url: &Url) -> Result<(), String>;
}

/// Opens URLs using the platform's default handler via `robius-open`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlatformOpener;

impl ExternalOpener for PlatformOpener {
    fn open(&self, url: &Url) -> Result<(), String> {
        robius_open::Uri::new(url.as_str())
            .open()
            .map_err(|e| format!("{e:?}"))
    }
}

/// What happened to a link passed to [`LinkOpener::open_link()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The link was a Matrix link and was handled in-app.
    HandledInApp,
    /// The link was passed to the external opener.
    OpenedExternally,
    /// The external opener failed to open the link.
    OpenFailed,
    /// The link's scheme is not in the allow list, so it was ignored.
    SchemeNotAllowed,
    /// The link could not be parsed as a URL.
    Invalid,
}

/// Routes links to the in-app Matrix handler or the external opener.
#[derive(Clone)]
pub struct LinkOpener {
    matrix_handler: Rc<dyn MatrixUriHandler>,
    external: Rc<dyn ExternalOpener>,
}

impl LinkOpener {
    pub fn new(matrix_handler: Rc<dyn MatrixUriHandler>, external: Rc<dyn ExternalOpener>) -> Self {
        Self { matrix_handler, external }
    }

    pub fn open_link(&self, link: &str) -> LinkOutcome {
        let handled_in_app = if let Ok(matrix_to_uri) = MatrixToUri::parse(link) {
            self.matrix_handler.handle_matrix_link(matrix_to_uri.id(), matrix_to_uri.via())
        } else if let Ok(matrix_uri) = MatrixUri::parse(link) {
            self.matrix_handler.handle_matrix_link(matrix_uri.id(), matrix_uri.via())
        } else {
            false
        };
        if handled_in_app {
            return LinkOutcome::HandledInApp;
        }

        let url = match Url::parse(link) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(target: "ui", "Url '{link}' not opened, because it could not be parsed: {e}");
                return LinkOutcome::Invalid;
            }
        };
        if !ALLOWED_URL_SCHEMES.contains(&url.scheme()) {
            tracing::warn!(target: "ui", "Url '{url}' not opened, because the scheme is not in the allow list");
            return LinkOutcome::SchemeNotAllowed;
        }

        tracing::debug!(target: "ui", "Opening URL \"{url}\"");
        match self.external.open(&url) {
            Ok(()) => LinkOutcome::OpenedExternally,
            Err(e) => {
                tracing::warn!(target: "ui", "could not open url: {url}. Error: {e}");
                LinkOutcome::OpenFailed
            }
        }
    }
}
