//! The bridge between the declarative UI layer and the rest of the client.
//!
//! The UI layer doesn't talk to the chat page or the user settings directly.
//! Instead, it calls into a [`ClientBridge`], which forwards each action
//! to the service that implements it and reports changes back as
//! [`BridgeEvent`]s.

use std::{cell::RefCell, collections::VecDeque, rc::{Rc, Weak}, time::Duration};

use ruma::{OwnedRoomId, OwnedUserId, RoomId};
use serde::Serialize;

use crate::{
    link_opener::{ExternalOpener, LinkOpener, LinkOutcome, MatrixUriHandler},
    theme::{Palette, Theme, ThemeKind},
};

/// The encryption algorithm enabled in newly-created encrypted rooms.
pub const MEGOLM_ALGORITHM: &str = "m.megolm.v1.aes-sha2";

/// The chat page: the part of the app that owns the rooms list, the timeline, and the session.
pub trait ChatPage: MatrixUriHandler {
    fn set_status(&self, message: &str);
    fn show_user_settings_page(&self);
    fn initiate_logout(&self);
    fn create_room(&self, request: CreateRoomRequest);
    fn join_room(&self, room_id_or_alias: &str);
    fn add_room_to_space(&self, room_id: &RoomId, space_id: &RoomId);
    fn remove_room_from_space(&self, room_id: &RoomId, space_id: &RoomId);
    /// Whether the local cache of the current session has been set up.
    fn is_cache_initialized(&self) -> bool;
    /// The user ID of the logged-in user, if any.
    fn local_user(&self) -> Option<OwnedUserId>;
}

/// The user's persistent settings.
pub struct UserSettings {
    theme: String,
    theme_changed_listeners: Vec<Box<dyn Fn(&str)>>,
}

impl UserSettings {
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            theme_changed_listeners: Vec::new(),
        }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Sets the theme, notifying listeners if it actually changed.
    pub fn set_theme(&mut self, theme: impl Into<String>) {
        let theme = theme.into();
        if theme == self.theme {
            return;
        }
        self.theme = theme;
        for listener in &self.theme_changed_listeners {
            listener(&self.theme);
        }
    }

    pub fn on_theme_changed(&mut self, listener: impl Fn(&str) + 'static) {
        self.theme_changed_listeners.push(Box::new(listener));
    }
}

/// Changes that the UI layer should react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BridgeEvent {
    /// The theme changed, so [`ClientBridge::colors()`] and friends return new values.
    ColorsChanged,
    /// The current user's profile was set or cleared.
    ProfileChanged,
}

/// The profile of the logged-in user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: OwnedUserId,
}

/// The preset used when creating a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPreset {
    PrivateChat,
    PublicChat,
    TrustedPrivateChat,
}
impl RoomPreset {
    /// Maps the UI's preset index to a preset. Unknown indices mean a private chat.
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Self::PublicChat,
            2 => Self::TrustedPrivateChat,
            _ => Self::PrivateChat,
        }
    }
}

/// A state event to be sent as part of creating a room.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InitialStateEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub state_key: String,
    pub content: serde_json::Value,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CreationContent {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
}

/// The body of a Matrix `createRoom` request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CreateRoomRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_alias_name: Option<String>,
    pub preset: RoomPreset,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub initial_state: Vec<InitialStateEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_content: Option<CreationContent>,
}

impl CreateRoomRequest {
    pub fn new(
        name: &str,
        topic: &str,
        alias_localpart: &str,
        is_encrypted: bool,
        is_space: bool,
        preset: RoomPreset,
    ) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let mut initial_state = Vec::new();
        if is_encrypted {
            initial_state.push(InitialStateEvent {
                event_type: String::from("m.room.encryption"),
                state_key: String::new(),
                content: serde_json::json!({ "algorithm": MEGOLM_ALGORITHM }),
            });
        }
        Self {
            name: non_empty(name),
            topic: non_empty(topic),
            room_alias_name: non_empty(alias_localpart),
            preset,
            initial_state,
            creation_content: is_space.then(|| CreationContent {
                room_type: Some(String::from("m.space")),
            }),
        }
    }
}

/// The façade through which the UI layer invokes app actions.
pub struct ClientBridge<C: ChatPage + 'static> {
    chat_page: Rc<C>,
    settings: Rc<RefCell<UserSettings>>,
    links: LinkOpener,
    tooltip_delay: Duration,
    current_user: Option<UserProfile>,
    events: Rc<RefCell<VecDeque<BridgeEvent>>>,
}

impl<C: ChatPage + 'static> ClientBridge<C> {
    pub fn new(
        chat_page: Rc<C>,
        settings: Rc<RefCell<UserSettings>>,
        external_opener: Rc<dyn ExternalOpener>,
        tooltip_delay: Duration,
    ) -> Self {
        let events = Rc::new(RefCell::new(VecDeque::new()));
        let events_weak: Weak<RefCell<VecDeque<BridgeEvent>>> = Rc::downgrade(&events);
        settings.borrow_mut().on_theme_changed(move |_theme| {
            if let Some(events) = events_weak.upgrade() {
                events.borrow_mut().push_back(BridgeEvent::ColorsChanged);
            }
        });
        let matrix_handler: Rc<dyn MatrixUriHandler> = chat_page.clone();
        Self {
            links: LinkOpener::new(matrix_handler, external_opener),
            chat_page,
            settings,
            tooltip_delay,
            current_user: None,
            events,
        }
    }

    /// Returns and clears all events raised since the last call.
    pub fn take_events(&self) -> Vec<BridgeEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    fn theme_kind(&self) -> ThemeKind {
        ThemeKind::from_name(self.settings.borrow().theme())
    }

    pub fn colors(&self) -> Palette {
        Palette::from_theme(self.theme_kind())
    }

    pub fn inactive_colors(&self) -> Palette {
        Palette::from_theme(self.theme_kind()).inactive()
    }

    pub fn theme(&self) -> Theme {
        Theme::new(self.theme_kind())
    }

    pub fn tooltip_delay(&self) -> Duration {
        self.tooltip_delay
    }

    /// Should be called once the chat page has loaded the session's content.
    pub fn update_user_profile(&mut self) {
        self.current_user = if self.chat_page.is_cache_initialized() {
            self.chat_page.local_user().map(|user_id| UserProfile { user_id })
        } else {
            None
        };
        self.events.borrow_mut().push_back(BridgeEvent::ProfileChanged);
    }

    pub fn current_user(&self) -> Option<&UserProfile> {
        tracing::debug!(target: "ui", "Profile requested");
        self.current_user.as_ref()
    }

    /// The link opener used by [`Self::open_link()`], for sharing with other UI components.
    pub fn link_opener(&self) -> &LinkOpener {
        &self.links
    }

    pub fn open_link(&self, link: &str) -> LinkOutcome {
        self.links.open_link(link)
    }

    pub fn set_status_message(&self, message: &str) {
        self.chat_page.set_status(message);
    }

    pub fn show_user_settings_page(&self) {
        self.chat_page.show_user_settings_page();
    }

    pub fn logout(&self) {
        self.chat_page.initiate_logout();
    }

    pub fn join_room(&self, room_id_or_alias: &str) {
        self.chat_page.join_room(room_id_or_alias);
    }

    /// Builds a `createRoom` request from the UI's inputs and hands it to the chat page.
    pub fn create_room(
        &self,
        name: &str,
        topic: &str,
        alias_localpart: &str,
        is_encrypted: bool,
        is_space: bool,
        preset: i32,
    ) {
        let request = CreateRoomRequest::new(
            name,
            topic,
            alias_localpart,
            is_encrypted,
            is_space,
            RoomPreset::from_index(preset),
        );
        self.chat_page.create_room(request);
    }

    pub fn add_room_to_space(&self, room_id: &str, space_id: &str) {
        if let Some((room_id, space_id)) = parse_room_and_space(room_id, space_id) {
            self.chat_page.add_room_to_space(&room_id, &space_id);
        }
    }

    pub fn remove_room_from_space(&self, room_id: &str, space_id: &str) {
        if let Some((room_id, space_id)) = parse_room_and_space(room_id, space_id) {
            self.chat_page.remove_room_from_space(&room_id, &space_id);
        }
    }
}

fn parse_room_and_space(room_id: &str, space_id: &str) -> Option<(OwnedRoomId, OwnedRoomId)> {
    match (RoomId::parse(room_id), RoomId::parse(space_id)) {
        (Ok(room_id), Ok(space_id)) => Some((room_id, space_id)),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(target: "ui", "Invalid room ID {room_id:?} or space ID {space_id:?}: {e}");
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use ruma::{OwnedServerName, matrix_uri::MatrixId};

    use super::*;
    use crate::{link_opener::tests::RecordingOpener, test_support::WarningCounter};

    #[derive(Default)]
    struct FakeChatPage {
        cache_initialized: Cell<bool>,
        statuses: RefCell<Vec<String>>,
        created_rooms: RefCell<Vec<CreateRoomRequest>>,
        joined_rooms: RefCell<Vec<String>>,
        space_changes: RefCell<Vec<(String, String, bool)>>,
        settings_shown: Cell<usize>,
        logouts: Cell<usize>,
        handled_links: RefCell<Vec<String>>,
    }
    impl MatrixUriHandler for FakeChatPage {
        fn handle_matrix_link(&self, id: &MatrixId, _via: &[OwnedServerName]) -> bool {
            if let MatrixId::User(user_id) = id {
                self.handled_links.borrow_mut().push(user_id.to_string());
                return true;
            }
            false
        }
    }
    impl ChatPage for FakeChatPage {
        fn set_status(&self, message: &str) {
            self.statuses.borrow_mut().push(message.to_string());
        }
        fn show_user_settings_page(&self) {
            self.settings_shown.set(self.settings_shown.get() + 1);
        }
        fn initiate_logout(&self) {
            self.logouts.set(self.logouts.get() + 1);
        }
        fn create_room(&self, request: CreateRoomRequest) {
            self.created_rooms.borrow_mut().push(request);
        }
        fn join_room(&self, room_id_or_alias: &str) {
            self.joined_rooms.borrow_mut().push(room_id_or_alias.to_string());
        }
        fn add_room_to_space(&self, room_id: &RoomId, space_id: &RoomId) {
            self.space_changes.borrow_mut().push((room_id.to_string(), space_id.to_string(), true));
        }
        fn remove_room_from_space(&self, room_id: &RoomId, space_id: &RoomId) {
            self.space_changes.borrow_mut().push((room_id.to_string(), space_id.to_string(), false));
        }
        fn is_cache_initialized(&self) -> bool {
            self.cache_initialized.get()
        }
        fn local_user(&self) -> Option<OwnedUserId> {
            Some(ruma::UserId::parse("@alice:example.org").unwrap())
        }
    }

    fn bridge(theme: &str) -> (ClientBridge<FakeChatPage>, Rc<FakeChatPage>, Rc<RefCell<UserSettings>>, Rc<RecordingOpener>) {
        let chat_page = Rc::new(FakeChatPage::default());
        let settings = Rc::new(RefCell::new(UserSettings::new(theme)));
        let opener = Rc::new(RecordingOpener::default());
        let bridge = ClientBridge::new(chat_page.clone(), settings.clone(), opener.clone(), Duration::from_millis(700));
        (bridge, chat_page, settings, opener)
    }

    #[test]
    fn test_colors_follow_theme_setting() {
        let (bridge, _, settings, _) = bridge("light");
        assert_eq!(bridge.colors(), Palette::from_theme(ThemeKind::Light));
        assert!(bridge.take_events().is_empty());

        settings.borrow_mut().set_theme("dark");
        assert_eq!(bridge.take_events(), [BridgeEvent::ColorsChanged]);
        assert_eq!(bridge.colors(), Palette::from_theme(ThemeKind::Dark));
        assert_eq!(bridge.inactive_colors(), Palette::from_theme(ThemeKind::Dark).inactive());
        assert_eq!(bridge.theme(), Theme::new(ThemeKind::Dark));

        // Setting the same theme again doesn't raise another event.
        settings.borrow_mut().set_theme("dark");
        assert!(bridge.take_events().is_empty());

        settings.borrow_mut().set_theme("something-else");
        assert_eq!(bridge.colors(), Palette::from_theme(ThemeKind::System));
    }

    #[test]
    fn test_update_user_profile() {
        let (mut bridge, chat_page, _, _) = bridge("light");
        bridge.update_user_profile();
        assert!(bridge.current_user().is_none());
        assert_eq!(bridge.take_events(), [BridgeEvent::ProfileChanged]);

        chat_page.cache_initialized.set(true);
        bridge.update_user_profile();
        assert_eq!(bridge.current_user().unwrap().user_id.as_str(), "@alice:example.org");
    }

    #[test]
    fn test_open_link() {
        let (bridge, chat_page, _, opener) = bridge("light");
        assert_eq!(bridge.open_link("https://matrix.to/#/@bob:example.org"), LinkOutcome::HandledInApp);
        assert_eq!(chat_page.handled_links.borrow().as_slice(), ["@bob:example.org"]);

        let warnings = WarningCounter::new();
        assert_eq!(
            warnings.run(|| bridge.open_link("javascript:alert(1)")),
            LinkOutcome::SchemeNotAllowed,
        );
        assert_eq!(warnings.count("ui"), 1);
        assert!(opener.opened.borrow().is_empty());
    }

    #[test]
    fn test_forwarded_actions() {
        let (bridge, chat_page, _, _) = bridge("light");
        bridge.set_status_message("Out for lunch");
        bridge.show_user_settings_page();
        bridge.logout();
        bridge.join_room("#rust:example.org");

        assert_eq!(chat_page.statuses.borrow().as_slice(), ["Out for lunch"]);
        assert_eq!(chat_page.settings_shown.get(), 1);
        assert_eq!(chat_page.logouts.get(), 1);
        assert_eq!(chat_page.joined_rooms.borrow().as_slice(), ["#rust:example.org"]);
        assert_eq!(bridge.tooltip_delay(), Duration::from_millis(700));
    }

    #[test]
    fn test_space_membership() {
        let (bridge, chat_page, _, _) = bridge("light");
        bridge.add_room_to_space("!room:example.org", "!space:example.org");
        bridge.remove_room_from_space("!room:example.org", "!space:example.org");

        let warnings = WarningCounter::new();
        warnings.run(|| bridge.add_room_to_space("not a room id", "!space:example.org"));
        assert_eq!(warnings.count("ui"), 1);

        assert_eq!(chat_page.space_changes.borrow().as_slice(), [
            (String::from("!room:example.org"), String::from("!space:example.org"), true),
            (String::from("!room:example.org"), String::from("!space:example.org"), false),
        ]);
    }

    #[test]
    fn test_create_encrypted_space() {
        let (bridge, chat_page, _, _) = bridge("light");
        bridge.create_room("Rustaceans", "All things Rust", "rust", true, true, 1);

        let created = chat_page.created_rooms.borrow();
        assert_eq!(created.len(), 1);
        let json = serde_json::to_value(&created[0]).unwrap();
        assert_eq!(json, serde_json::json!({
            "name": "Rustaceans",
            "topic": "All things Rust",
            "room_alias_name": "rust",
            "preset": "public_chat",
            "initial_state": [{
                "type": "m.room.encryption",
                "state_key": "",
                "content": { "algorithm": "m.megolm.v1.aes-sha2" }
            }],
            "creation_content": { "type": "m.space" }
        }));
    }

    #[test]
    fn test_create_plain_room() {
        let request = CreateRoomRequest::new("", "", "", false, false, RoomPreset::from_index(7));
        assert_eq!(serde_json::to_value(&request).unwrap(), serde_json::json!({ "preset": "private_chat" }));
        assert_eq!(RoomPreset::from_index(2), RoomPreset::TrustedPrivateChat);
        assert_eq!(RoomPreset::from_index(0), RoomPreset::PrivateChat);
        assert_eq!(RoomPreset::from_index(-1), RoomPreset::PrivateChat);
    }
}
