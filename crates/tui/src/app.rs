use std::{future::Future, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use salvo_core::{
    api::{resolve_join, ApiClient, ApiError},
    board::{self, BoardSide},
    game::{CellCursor, GameView, StrikeRefusal},
    lobby::GameFilter,
    models::{Credentials, Game, ShipCoord, UserDetails},
    placement::{Orientation, ShipStaging, SHIP_SIZES},
    poll::{GamePoller, PollHandle, PollUpdate},
    session::{Session, SessionStore},
    AppConfig,
};
use tokio::{spawn, sync::mpsc};
use tracing::{debug, error, info, warn};

use crate::widgets::{centered_rect, grid_lines, legend_line, TextField, Theme};

const TICK_RATE: Duration = Duration::from_millis(250);
const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Register,
    Login,
    UserDetails,
    Lobby,
    JoinGame,
    LiveGames,
    ConfigureTable,
    Game,
}

impl Screen {
    fn title(&self) -> &'static str {
        match self {
            Self::Register => "Register",
            Self::Login => "Login",
            Self::UserDetails => "User Details",
            Self::Lobby => "Lobby",
            Self::JoinGame => "Join Game",
            Self::LiveGames => "My Games",
            Self::ConfigureTable => "Configure Table",
            Self::Game => "Game",
        }
    }

    fn hints(&self) -> &'static str {
        match self {
            Self::Register | Self::Login => "Tab/↑↓ move • Enter select • Ctrl-C quit",
            Self::UserDetails => "↑↓ move • Enter select • r refresh • q quit",
            Self::Lobby => "c create • i join by id • Enter join • r refresh • Esc back",
            Self::JoinGame => "Enter join • Esc back",
            Self::LiveGames => "Tab switch list • Enter open • r refresh • Esc back",
            Self::ConfigureTable => {
                "arrows anchor • s size • o direction • a add • [ ] select • x remove • Enter send • Esc back"
            }
            Self::Game => "arrows aim • Enter strike • c configure • r refresh • Esc back",
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    Api(ApiEvent),
}

enum ApiEvent {
    Registered(Result<(), ApiError>),
    LoggedIn(Result<Session, ApiError>),
    Profile(Result<UserDetails, ApiError>),
    Games {
        filter: GameFilter,
        result: Result<Vec<Game>, ApiError>,
    },
    Created(Result<Game, ApiError>),
    Joined {
        requested: String,
        result: Result<Game, ApiError>,
    },
    Viewer {
        game_id: String,
        result: Result<UserDetails, ApiError>,
    },
    Configured {
        game_id: String,
        result: Result<(), ApiError>,
    },
    Struck {
        game_id: String,
        target: String,
        result: Result<Game, ApiError>,
    },
}

#[derive(Debug, Clone)]
struct Alert {
    title: String,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthFocus {
    Email,
    Password,
    Submit,
    Switch,
}

impl AuthFocus {
    const ORDER: [AuthFocus; 4] = [
        AuthFocus::Email,
        AuthFocus::Password,
        AuthFocus::Submit,
        AuthFocus::Switch,
    ];

    fn step(self, delta: isize) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0) as isize;
        let len = Self::ORDER.len() as isize;
        Self::ORDER[((idx + delta).rem_euclid(len)) as usize]
    }
}

#[derive(Debug, Clone)]
struct AuthForm {
    email: TextField,
    password: TextField,
    focus: AuthFocus,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self {
            email: TextField::default(),
            password: TextField::masked(),
            focus: AuthFocus::Email,
        }
    }
}

impl AuthForm {
    fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.trimmed(),
            password: self.password.value().to_string(),
        }
    }

    fn active_field(&mut self) -> Option<&mut TextField> {
        match self.focus {
            AuthFocus::Email => Some(&mut self.email),
            AuthFocus::Password => Some(&mut self.password),
            AuthFocus::Submit | AuthFocus::Switch => None,
        }
    }
}

#[derive(Debug, Default)]
struct GameListState {
    games: Vec<Game>,
    cursor: usize,
    loading: bool,
    error: Option<String>,
    filter: GameFilter,
}

impl GameListState {
    fn with_filter(filter: GameFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.games.is_empty() {
            self.cursor = 0;
            return;
        }
        let max = self.games.len() as isize - 1;
        self.cursor = (self.cursor as isize + delta).clamp(0, max) as usize;
    }

    fn selected(&self) -> Option<&Game> {
        self.games.get(self.cursor)
    }

    fn set_games(&mut self, games: Vec<Game>) {
        self.games = games;
        self.error = None;
        self.loading = false;
        self.move_cursor(0);
    }
}

#[derive(Debug)]
struct ConfigureState {
    game_id: String,
    staging: ShipStaging,
    anchor: CellCursor,
    size_index: usize,
    orientation: Orientation,
    selected: usize,
    submitting: bool,
}

impl ConfigureState {
    fn new(game_id: String) -> Self {
        Self {
            game_id,
            staging: ShipStaging::new(),
            anchor: CellCursor::default(),
            size_index: 0,
            orientation: Orientation::default(),
            selected: 0,
            submitting: false,
        }
    }

    fn size(&self) -> u32 {
        SHIP_SIZES[self.size_index % SHIP_SIZES.len()]
    }

    fn add_ship(&mut self) {
        let (row, column, size, orientation) = (
            self.anchor.row_label(),
            self.anchor.column(),
            self.size(),
            self.orientation,
        );
        self.staging.add_ship(row, column, size, orientation);
        self.selected = self.staging.len() - 1;
    }

    fn remove_selected(&mut self) {
        self.staging.remove_ship(self.selected);
        self.selected = self.selected.min(self.staging.len().saturating_sub(1));
    }

    fn move_selection(&mut self, delta: isize) {
        if self.staging.is_empty() {
            self.selected = 0;
            return;
        }
        let max = self.staging.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, max) as usize;
    }

    fn toggle_orientation(&mut self) {
        self.orientation = match self.orientation {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        };
    }

    /// Staged anchors as ship cells, for the preview grid.
    fn preview(&self) -> Vec<ShipCoord> {
        self.staging
            .ships()
            .iter()
            .map(|ship| ShipCoord {
                player_id: String::new(),
                x: ship.x.clone(),
                y: ship.y,
            })
            .collect()
    }
}

#[derive(Debug)]
struct GameScreenState {
    game_id: String,
    game: Option<Game>,
    viewer_id: Option<String>,
    loading: bool,
    poller: Option<PollHandle>,
    target: CellCursor,
}

impl GameScreenState {
    fn new(game_id: String) -> Self {
        Self {
            game_id,
            game: None,
            viewer_id: None,
            loading: true,
            poller: None,
            target: CellCursor::default(),
        }
    }

    fn view(&self) -> Option<GameView<'_>> {
        let game = self.game.as_ref()?;
        Some(GameView::new(game, self.viewer_id.as_deref().unwrap_or("")))
    }
}

/// Terminal client state.
pub struct SalvoApp {
    config: AppConfig,
    client: ApiClient,
    store: SessionStore,
    session: Option<Session>,
    screen: Screen,
    history: Vec<Screen>,
    theme: Theme,
    status: String,
    should_quit: bool,
    ticks: usize,
    alert: Option<Alert>,
    event_tx: mpsc::Sender<AppEvent>,
    event_rx: Option<mpsc::Receiver<AppEvent>>,
    poll_tx: mpsc::Sender<PollUpdate>,
    poll_rx: Option<mpsc::Receiver<PollUpdate>>,
    register: AuthForm,
    login: AuthForm,
    profile: Option<UserDetails>,
    profile_loading: bool,
    menu_cursor: usize,
    lobby: GameListState,
    live: GameListState,
    join_input: TextField,
    configure: Option<ConfigureState>,
    game: Option<GameScreenState>,
}

impl SalvoApp {
    pub fn new(
        config: AppConfig,
        client: ApiClient,
        store: SessionStore,
        session: Option<Session>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(128);
        let (poll_tx, poll_rx) = mpsc::channel(32);
        let screen = if session.is_some() {
            Screen::UserDetails
        } else {
            Screen::Register
        };
        let status = match &session {
            Some(session) => format!(
                "Signed in as {} since {}",
                session.email(),
                session
                    .logged_in_at()
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
            ),
            None => "Create an account or log in".to_string(),
        };
        Self {
            config,
            client,
            store,
            session,
            screen,
            history: Vec::new(),
            theme: Theme::default(),
            status,
            should_quit: false,
            ticks: 0,
            alert: None,
            event_tx,
            event_rx: Some(event_rx),
            poll_tx,
            poll_rx: Some(poll_rx),
            register: AuthForm::default(),
            login: AuthForm::default(),
            profile: None,
            profile_loading: false,
            menu_cursor: 0,
            lobby: GameListState::with_filter(GameFilter::Open),
            live: GameListState::with_filter(GameFilter::Ongoing),
            join_input: TextField::default(),
            configure: None,
            game: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut event_rx = self
            .event_rx
            .take()
            .context("application is already running")?;
        let mut poll_rx = self
            .poll_rx
            .take()
            .context("application is already running")?;

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        spawn_input_thread(self.event_tx.clone());
        info!(api = %self.client.base_url(), screen = self.screen.title(), "Client started");
        self.on_focus();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            tokio::select! {
                maybe_event = event_rx.recv() => match maybe_event {
                    Some(event) => self.process_app_event(event),
                    None => break,
                },
                Some(update) = poll_rx.recv() => self.handle_poll_update(update),
            }

            if self.should_quit {
                break;
            }
        }

        self.game = None;
        restore_terminal(&mut terminal)?;
        Ok(())
    }

    fn process_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(event) => self.handle_input(event),
            AppEvent::Tick => self.ticks = self.ticks.wrapping_add(1),
            AppEvent::Api(event) => self.handle_api_event(event),
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = format!("[{}] {}", Local::now().format("%H:%M:%S"), message.into());
    }

    fn show_alert(&mut self, title: impl Into<String>, message: impl Into<String>) {
        let alert = Alert {
            title: title.into(),
            message: message.into(),
        };
        self.set_status(format!("{}: {}", alert.title, alert.message));
        self.alert = Some(alert);
    }

    fn spinner(&self) -> char {
        SPINNER[self.ticks % SPINNER.len()]
    }

    fn navigate(&mut self, screen: Screen) {
        if self.screen == screen {
            self.on_focus();
            return;
        }
        self.on_blur();
        self.history.push(self.screen);
        self.screen = screen;
        self.on_focus();
    }

    fn go_back(&mut self) {
        let Some(previous) = self.history.pop() else {
            return;
        };
        self.on_blur();
        self.screen = previous;
        self.on_focus();
    }

    fn reset_to(&mut self, screen: Screen) {
        self.on_blur();
        self.history.clear();
        self.screen = screen;
        self.on_focus();
    }

    fn on_blur(&mut self) {
        if self.screen == Screen::Game {
            if let Some(game) = self.game.as_mut() {
                if let Some(poller) = game.poller.take() {
                    poller.stop();
                }
            }
        }
    }

    fn on_focus(&mut self) {
        debug!(screen = self.screen.title(), "Screen focused");
        match self.screen {
            Screen::UserDetails => self.load_profile(),
            Screen::Lobby => self.load_games(GameFilter::Open),
            Screen::LiveGames => self.load_games(self.live.filter),
            Screen::Game => self.start_polling(),
            Screen::Register | Screen::Login | Screen::JoinGame | Screen::ConfigureTable => {}
        }
    }

    fn require_session(&mut self) -> Option<Session> {
        if let Some(session) = &self.session {
            return Some(session.clone());
        }
        warn!(screen = self.screen.title(), "Request aborted: no session");
        self.show_alert("Not logged in", "Please log in to continue.");
        self.reset_to(Screen::Login);
        None
    }

    fn spawn_request<F>(&self, request: F)
    where
        F: Future<Output = ApiEvent> + Send + 'static,
    {
        let sender = self.event_tx.clone();
        spawn(async move {
            let event = request.await;
            let _ = sender.send(AppEvent::Api(event)).await;
        });
    }

    fn submit_register(&mut self) {
        let credentials = self.register.credentials();
        let client = self.client.clone();
        info!(email = %credentials.email, "Registering account");
        self.set_status("Registering…");
        self.spawn_request(async move { ApiEvent::Registered(client.register(&credentials).await) });
    }

    fn submit_login(&mut self) {
        let credentials = self.login.credentials();
        let client = self.client.clone();
        info!(email = %credentials.email, "Logging in");
        self.set_status("Logging in…");
        self.spawn_request(async move { ApiEvent::LoggedIn(client.login(&credentials).await) });
    }

    fn load_profile(&mut self) {
        let Some(session) = self.require_session() else {
            return;
        };
        self.profile_loading = true;
        let client = self.client.clone();
        self.spawn_request(async move { ApiEvent::Profile(client.user_details(&session).await) });
    }

    fn logout(&mut self) {
        if let Err(err) = self.store.clear() {
            error!(?err, "Failed to clear session");
            self.show_alert("Logout Failed", "An error occurred while logging out.");
            return;
        }
        self.session = None;
        self.profile = None;
        self.configure = None;
        self.game = None;
        self.login = AuthForm::default();
        info!("Logged out");
        self.show_alert("Logged out", "You have been logged out.");
        self.reset_to(Screen::Login);
    }

    fn load_games(&mut self, filter: GameFilter) {
        let Some(session) = self.require_session() else {
            return;
        };
        let list = if filter == GameFilter::Open {
            &mut self.lobby
        } else {
            &mut self.live
        };
        list.loading = true;

        let client = self.client.clone();
        self.spawn_request(async move {
            let result = async {
                let viewer = match filter {
                    GameFilter::Open => String::new(),
                    GameFilter::Ongoing | GameFilter::History => {
                        client.user_details(&session).await?.user.id
                    }
                };
                let games = client.games(&session).await?;
                Ok(filter.apply(games, &viewer))
            }
            .await;
            ApiEvent::Games { filter, result }
        });
    }

    fn create_game(&mut self) {
        let Some(session) = self.require_session() else {
            return;
        };
        let client = self.client.clone();
        self.set_status("Creating game…");
        self.spawn_request(async move { ApiEvent::Created(client.create_game(&session).await) });
    }

    fn join_game(&mut self, game_id: String) {
        let Some(session) = self.require_session() else {
            return;
        };
        if game_id.is_empty() {
            self.show_alert("Failed to join game.", "Please enter a game ID.");
            return;
        }
        let client = self.client.clone();
        info!(%game_id, "Joining game");
        self.set_status(format!("Joining {game_id}…"));
        self.spawn_request(async move {
            let result = client.join_game(&session, &game_id).await;
            ApiEvent::Joined {
                requested: game_id,
                result,
            }
        });
    }

    fn open_game(&mut self, game_id: String) {
        let same = self
            .game
            .as_ref()
            .map(|game| game.game_id == game_id)
            .unwrap_or(false);
        if !same {
            let mut state = GameScreenState::new(game_id.clone());
            state.viewer_id = self.profile.as_ref().map(|details| details.user.id.clone());
            self.game = Some(state);
            self.fetch_viewer(game_id);
        }
        self.navigate(Screen::Game);
    }

    fn fetch_viewer(&mut self, game_id: String) {
        let Some(session) = self.require_session() else {
            return;
        };
        let client = self.client.clone();
        self.spawn_request(async move {
            let result = client.user_details(&session).await;
            ApiEvent::Viewer { game_id, result }
        });
    }

    fn start_polling(&mut self) {
        let Some(session) = self.require_session() else {
            return;
        };
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let handle = GamePoller::for_game(
            self.client.clone(),
            session,
            game.game_id.clone(),
            self.config.poll_interval(),
            self.poll_tx.clone(),
        );
        info!(game_id = %game.game_id, subscription = handle.subscription(), "Polling game");
        game.poller = Some(handle);
    }

    fn handle_poll_update(&mut self, update: PollUpdate) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let active = game
            .poller
            .as_ref()
            .map(|poller| poller.subscription() == update.subscription)
            .unwrap_or(false);
        if !active {
            debug!(subscription = update.subscription, "Discarding stale game update");
            return;
        }

        game.loading = false;
        match update.result {
            Ok(fresh) => {
                let changed = game
                    .game
                    .as_ref()
                    .map(|current| current.status != fresh.status)
                    .unwrap_or(true);
                if changed {
                    info!(game_id = %fresh.id, status = %fresh.status, "Game status");
                }
                game.game = Some(fresh);
            }
            Err(err) => {
                self.set_status(format!("Refresh failed: {err}"));
            }
        }
    }

    fn open_configure(&mut self) {
        let Some(game) = self.game.as_ref() else {
            return;
        };
        let allowed = game.view().map(|view| view.can_configure()).unwrap_or(false);
        if !allowed {
            self.show_alert(
                "Cannot Configure Table",
                "The game must be in MAP_CONFIG state to configure the table.",
            );
            return;
        }
        let game_id = game.game_id.clone();
        let keep = self
            .configure
            .as_ref()
            .map(|state| state.game_id == game_id)
            .unwrap_or(false);
        if !keep {
            self.configure = Some(ConfigureState::new(game_id));
        }
        self.navigate(Screen::ConfigureTable);
    }

    fn send_configuration(&mut self) {
        let Some(session) = self.require_session() else {
            return;
        };
        let Some(state) = self.configure.as_mut() else {
            return;
        };
        if state.submitting {
            return;
        }
        let request = match state.staging.submit(&state.game_id) {
            Ok(request) => request,
            Err(err) => {
                warn!(%err, "Ship configuration rejected locally");
                self.show_alert("Invalid ship configuration", err.to_string());
                return;
            }
        };
        state.submitting = true;
        let client = self.client.clone();
        info!(game_id = %request.game_id, ships = request.body.ships.len(), "Sending configuration");
        self.set_status("Sending configuration…");
        self.spawn_request(async move {
            let result = client.configure_game(&session, &request).await;
            ApiEvent::Configured {
                game_id: request.game_id,
                result,
            }
        });
    }

    fn strike(&mut self) {
        let Some(session) = self.require_session() else {
            return;
        };
        let Some(game) = self.game.as_ref() else {
            return;
        };
        let Some(view) = game.view() else {
            return;
        };
        match view.check_strike() {
            Ok(()) => {}
            Err(StrikeRefusal::NotYourTurn) => {
                self.show_alert("Not your turn", "Wait for your turn to make a move.");
                return;
            }
            Err(StrikeRefusal::NotActive) => {
                self.set_status("Strikes are only possible in an active game");
                return;
            }
        }

        let game_id = game.game_id.clone();
        let request = game.target.strike();
        let target = game.target.label();
        let client = self.client.clone();
        info!(%game_id, %target, "Striking");
        self.spawn_request(async move {
            let result = client.strike(&session, &game_id, &request).await;
            ApiEvent::Struck {
                game_id,
                target,
                result,
            }
        });
    }

    fn handle_api_event(&mut self, event: ApiEvent) {
        match event {
            ApiEvent::Registered(result) => match result {
                Ok(()) => {
                    self.show_alert(
                        "Registration Successful",
                        "You can now log in with your credentials.",
                    );
                    self.register = AuthForm::default();
                    self.navigate(Screen::Login);
                }
                Err(err) => {
                    error!(%err, "Registration failed");
                    self.show_alert(
                        "Registration Failed",
                        "Please check your details and try again.",
                    );
                }
            },
            ApiEvent::LoggedIn(result) => match result {
                Ok(session) => {
                    if let Err(err) = self.store.save(&session) {
                        error!(?err, "Failed to persist session");
                    }
                    self.session = Some(session);
                    self.login.password.clear();
                    self.show_alert("Login Successful", "You are now logged in.");
                    self.navigate(Screen::UserDetails);
                }
                Err(err) => {
                    error!(%err, "Login failed");
                    let message = match err {
                        ApiError::Transport(_) => format!("Could not reach the server: {err}"),
                        _ => "Invalid email or password. Please try again.".to_string(),
                    };
                    self.show_alert("Login Failed", message);
                }
            },
            ApiEvent::Profile(result) => {
                self.profile_loading = false;
                match result {
                    Ok(details) => {
                        self.set_status(format!("Signed in as {}", details.user.email));
                        self.profile = Some(details);
                    }
                    Err(err) => {
                        error!(%err, "Error fetching user details");
                        self.profile = None;
                        self.set_status(format!("Failed to load profile: {err}"));
                    }
                }
            }
            ApiEvent::Games { filter, result } => {
                let list = if filter == GameFilter::Open {
                    &mut self.lobby
                } else if self.live.filter == filter {
                    &mut self.live
                } else {
                    debug!(%filter, "Discarding list for inactive filter");
                    return;
                };
                match result {
                    Ok(games) => list.set_games(games),
                    Err(err) => {
                        error!(%err, %filter, "Error fetching games");
                        list.loading = false;
                        list.error = Some(if filter == GameFilter::Open {
                            "Failed to load games.".to_string()
                        } else {
                            "Failed to load live games.".to_string()
                        });
                    }
                }
            }
            ApiEvent::Created(result) => match result {
                Ok(game) => {
                    info!(game_id = %game.id, "Game created");
                    self.show_alert("Game Created", format!("Game ID: {}", game.id));
                    self.open_game(game.id);
                }
                Err(err) => {
                    error!(%err, "Error creating game");
                    self.show_alert("Failed to create game.", err.to_string());
                }
            },
            ApiEvent::Joined { requested, result } => {
                let joined = result.is_ok();
                match resolve_join(result, &requested) {
                    Ok(game_id) => {
                        if joined {
                            self.show_alert(
                                "Game Joined",
                                format!("You have joined game ID: {game_id}"),
                            );
                        } else {
                            info!(%game_id, "Join unauthorized; opening game anyway");
                        }
                        self.join_input.clear();
                        self.open_game(game_id);
                    }
                    Err(err) => {
                        error!(%err, game_id = %requested, "Error joining game");
                        self.show_alert(
                            "Failed to join game.",
                            "Please check the game ID and try again.",
                        );
                    }
                }
            }
            ApiEvent::Viewer { game_id, result } => match result {
                Ok(details) => {
                    if let Some(game) = self.game.as_mut().filter(|game| game.game_id == game_id) {
                        game.viewer_id = Some(details.user.id.clone());
                    }
                    self.profile = Some(details);
                }
                Err(err) => error!(%err, %game_id, "Error fetching user ID"),
            },
            ApiEvent::Configured { game_id, result } => {
                let Some(state) = self
                    .configure
                    .as_mut()
                    .filter(|state| state.game_id == game_id)
                else {
                    return;
                };
                state.submitting = false;
                match result {
                    Ok(()) => {
                        state.staging.accept();
                        state.selected = 0;
                        info!(%game_id, "Configuration accepted");
                        self.show_alert(
                            "Configuration Sent",
                            "Your ship configuration has been sent.",
                        );
                        if self.screen == Screen::ConfigureTable {
                            self.go_back();
                        }
                    }
                    Err(err) => {
                        error!(%err, %game_id, "Error sending configuration");
                        let message = match err {
                            ApiError::Status { message, .. }
                            | ApiError::Unauthorized { message, .. } => message,
                            _ => "Please try again.".to_string(),
                        };
                        self.show_alert("Failed to send configuration.", message);
                    }
                }
            }
            ApiEvent::Struck {
                game_id,
                target,
                result,
            } => match result {
                Ok(updated) => {
                    self.show_alert("Strike Made", format!("You have struck at {target}"));
                    if let Some(game) = self.game.as_mut().filter(|game| game.game_id == game_id) {
                        game.game = Some(updated);
                        if let Some(poller) = game.poller.as_ref() {
                            poller.refresh();
                        }
                    }
                }
                Err(err) => {
                    error!(%err, %game_id, "Error making strike");
                    self.show_alert("Failed to make strike.", "Please try again.");
                }
            },
        }
    }

    fn handle_input(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        if self.alert.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                self.alert = None;
            }
            return;
        }
        match self.screen {
            Screen::Register => self.handle_auth_key(key, Screen::Register),
            Screen::Login => self.handle_auth_key(key, Screen::Login),
            Screen::UserDetails => self.handle_user_details_key(key),
            Screen::Lobby => self.handle_lobby_key(key),
            Screen::JoinGame => self.handle_join_key(key),
            Screen::LiveGames => self.handle_live_games_key(key),
            Screen::ConfigureTable => self.handle_configure_key(key),
            Screen::Game => self.handle_game_key(key),
        }
    }

    fn handle_auth_key(&mut self, key: KeyEvent, screen: Screen) {
        let form = if screen == Screen::Register {
            &mut self.register
        } else {
            &mut self.login
        };
        match key.code {
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.step(1),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.step(-1),
            KeyCode::Enter => match form.focus {
                AuthFocus::Email | AuthFocus::Password => form.focus = form.focus.step(1),
                AuthFocus::Submit => {
                    if screen == Screen::Register {
                        self.submit_register();
                    } else {
                        self.submit_login();
                    }
                }
                AuthFocus::Switch => {
                    let target = if screen == Screen::Register {
                        Screen::Login
                    } else {
                        Screen::Register
                    };
                    self.navigate(target);
                }
            },
            KeyCode::Esc => self.go_back(),
            code => {
                if let Some(field) = form.active_field() {
                    edit_field(field, code);
                }
            }
        }
    }

    fn handle_user_details_key(&mut self, key: KeyEvent) {
        const ITEMS: usize = 3;
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
                self.menu_cursor = (self.menu_cursor + 1) % ITEMS;
            }
            KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
                self.menu_cursor = (self.menu_cursor + ITEMS - 1) % ITEMS;
            }
            KeyCode::Char('r') => self.load_profile(),
            KeyCode::Enter => match self.menu_cursor {
                0 => self.navigate(Screen::Lobby),
                1 => self.navigate(Screen::LiveGames),
                _ => self.logout(),
            },
            _ => {}
        }
    }

    fn handle_lobby_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.go_back(),
            KeyCode::Char('j') | KeyCode::Down => self.lobby.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.lobby.move_cursor(-1),
            KeyCode::Char('r') => self.load_games(GameFilter::Open),
            KeyCode::Char('c') => self.create_game(),
            KeyCode::Char('i') => self.navigate(Screen::JoinGame),
            KeyCode::Enter => {
                if let Some(game_id) = self.lobby.selected().map(|game| game.id.clone()) {
                    self.join_game(game_id);
                }
            }
            _ => {}
        }
    }

    fn handle_join_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.go_back(),
            KeyCode::Enter => {
                let game_id = self.join_input.trimmed();
                self.join_game(game_id);
            }
            code => edit_field(&mut self.join_input, code),
        }
    }

    fn handle_live_games_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.go_back(),
            KeyCode::Char('j') | KeyCode::Down => self.live.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.live.move_cursor(-1),
            KeyCode::Char('r') => self.load_games(self.live.filter),
            KeyCode::Tab | KeyCode::Char('h') | KeyCode::Char('o') => {
                let filter = match key.code {
                    KeyCode::Char('h') => GameFilter::History,
                    KeyCode::Char('o') => GameFilter::Ongoing,
                    _ => self.live.filter.toggled(),
                };
                if filter != self.live.filter {
                    self.live = GameListState::with_filter(filter);
                    self.load_games(filter);
                }
            }
            KeyCode::Enter => {
                if let Some(game_id) = self.live.selected().map(|game| game.id.clone()) {
                    self.join_game(game_id);
                }
            }
            _ => {}
        }
    }

    fn handle_configure_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Esc {
            self.go_back();
            return;
        }
        if key.code == KeyCode::Enter {
            self.send_configuration();
            return;
        }
        let Some(state) = self.configure.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Up => state.anchor.shift(-1, 0),
            KeyCode::Down => state.anchor.shift(1, 0),
            KeyCode::Left => state.anchor.shift(0, -1),
            KeyCode::Right => state.anchor.shift(0, 1),
            KeyCode::Char('s') => state.size_index = (state.size_index + 1) % SHIP_SIZES.len(),
            KeyCode::Char('o') => state.toggle_orientation(),
            KeyCode::Char('a') => state.add_ship(),
            KeyCode::Char('[') => state.move_selection(-1),
            KeyCode::Char(']') => state.move_selection(1),
            KeyCode::Char('x') | KeyCode::Delete | KeyCode::Backspace => state.remove_selected(),
            _ => {}
        }
    }

    fn handle_game_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.go_back(),
            KeyCode::Char('c') => self.open_configure(),
            KeyCode::Char('r') => {
                if let Some(poller) = self.game.as_ref().and_then(|game| game.poller.as_ref()) {
                    poller.refresh();
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.strike(),
            KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right => {
                let Some(game) = self.game.as_mut() else {
                    return;
                };
                match key.code {
                    KeyCode::Up => game.target.shift(-1, 0),
                    KeyCode::Down => game.target.shift(1, 0),
                    KeyCode::Left => game.target.shift(0, -1),
                    _ => game.target.shift(0, 1),
                }
            }
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(area);

        self.render_header(frame, layout[0]);
        match self.screen {
            Screen::Register => self.draw_auth(frame, layout[1], Screen::Register),
            Screen::Login => self.draw_auth(frame, layout[1], Screen::Login),
            Screen::UserDetails => self.draw_user_details(frame, layout[1]),
            Screen::Lobby => self.draw_lobby(frame, layout[1]),
            Screen::JoinGame => self.draw_join(frame, layout[1]),
            Screen::LiveGames => self.draw_live_games(frame, layout[1]),
            Screen::ConfigureTable => self.draw_configure(frame, layout[1]),
            Screen::Game => self.draw_game(frame, layout[1]),
        }
        self.render_status(frame, layout[2]);

        if let Some(alert) = &self.alert {
            self.render_alert(frame, alert);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled(
                "SALVO",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  ·  "),
            Span::styled(self.screen.title(), Style::default().fg(self.theme.primary_fg)),
        ]);
        let header = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Left);
        frame.render_widget(header, area);
    }

    fn draw_auth(&self, frame: &mut Frame, area: Rect, screen: Screen) {
        let (form, submit, prompt, switch) = if screen == Screen::Register {
            (
                &self.register,
                "Register",
                "Already have an account?",
                "Go to Login",
            )
        } else {
            (
                &self.login,
                "Login",
                "Don't have an account?",
                "Go to Register",
            )
        };

        let field_style = |focused: bool| {
            if focused {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.primary_fg)
            }
        };
        let button = |label: &str, focused: bool| {
            if focused {
                Span::styled(
                    format!("▶ [ {label} ]"),
                    Style::default()
                        .fg(self.theme.selection_fg)
                        .bg(self.theme.selection_bg)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::styled(
                    format!("  [ {label} ]"),
                    Style::default().fg(self.theme.primary_fg),
                )
            }
        };

        let email_focus = form.focus == AuthFocus::Email;
        let password_focus = form.focus == AuthFocus::Password;
        let lines = vec![
            Line::from(Span::styled("Email:", field_style(email_focus))),
            Line::from(form.email.display(email_focus)),
            Line::from(""),
            Line::from(Span::styled("Password:", field_style(password_focus))),
            Line::from(form.password.display(password_focus)),
            Line::from(""),
            Line::from(button(submit, form.focus == AuthFocus::Submit)),
            Line::from(""),
            Line::from(Span::styled(prompt, Style::default().fg(self.theme.muted))),
            Line::from(button(switch, form.focus == AuthFocus::Switch)),
        ];

        let box_area = centered_rect(48, lines.len() as u16 + 2, area);
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(screen.title()));
        frame.render_widget(paragraph, box_area);
    }

    fn draw_user_details(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        match &self.profile {
            Some(details) => {
                for (label, value) in details.summary() {
                    lines.push(Line::from(vec![
                        Span::styled(format!("{label}: "), Style::default().fg(self.theme.muted)),
                        Span::styled(value, Style::default().fg(self.theme.primary_fg)),
                    ]));
                }
            }
            None if self.profile_loading => {
                lines.push(Line::from(format!("{} Loading…", self.spinner())));
            }
            None => {
                lines.push(Line::from(Span::styled(
                    "No user details available.",
                    Style::default().fg(self.theme.danger),
                )));
            }
        }
        lines.push(Line::from(""));

        for (idx, item) in ["Public Games", "My Games", "Logout"].iter().enumerate() {
            if idx == self.menu_cursor {
                lines.push(Line::from(Span::styled(
                    format!("▶ {item}"),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                )));
            } else {
                lines.push(Line::from(Span::styled(
                    format!("  {item}"),
                    Style::default().fg(self.theme.primary_fg),
                )));
            }
        }

        let box_area = centered_rect(52, lines.len() as u16 + 2, area);
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Profile"));
        frame.render_widget(paragraph, box_area);
    }

    fn draw_lobby(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let actions = Paragraph::new(Line::from(vec![
            Span::styled("[c] Create Game", Style::default().fg(self.theme.accent)),
            Span::raw("   "),
            Span::styled("[i] Join Game By ID", Style::default().fg(self.theme.accent)),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(actions, layout[0]);

        self.render_game_list(frame, layout[1], &self.lobby, "Open Games");
    }

    fn draw_live_games(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let tab = |filter: GameFilter| {
            let label = format!(" {filter} ");
            if filter == self.live.filter {
                Span::styled(
                    label,
                    Style::default()
                        .fg(self.theme.selection_fg)
                        .bg(self.theme.selection_bg)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                Span::styled(label, Style::default().fg(self.theme.muted))
            }
        };
        let tabs = Paragraph::new(Line::from(vec![
            tab(GameFilter::Ongoing),
            Span::raw(" │ "),
            tab(GameFilter::History),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(tabs, layout[0]);

        let title = self.live.filter.to_string();
        self.render_game_list(frame, layout[1], &self.live, &title);
    }

    fn render_game_list(&self, frame: &mut Frame, area: Rect, list: &GameListState, title: &str) {
        let block = Block::default().borders(Borders::ALL).title(title.to_string());

        if list.loading && list.games.is_empty() {
            let paragraph =
                Paragraph::new(format!("{} Loading...", self.spinner())).block(block);
            frame.render_widget(paragraph, area);
            return;
        }
        if let Some(error) = &list.error {
            let paragraph = Paragraph::new(Span::styled(
                error.clone(),
                Style::default().fg(self.theme.danger),
            ))
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        }
        if list.games.is_empty() {
            let paragraph = Paragraph::new(Span::styled(
                "No games found.",
                Style::default().fg(self.theme.muted),
            ))
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = list
            .games
            .iter()
            .map(|game| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!("Game ID: {}", game.id)),
                    Span::raw("   "),
                    Span::styled(
                        format!("Status: {}", game.status),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();
        let widget = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(self.theme.selection_fg)
                    .bg(self.theme.selection_bg)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut state = ListState::default();
        state.select(Some(list.cursor));
        frame.render_stateful_widget(widget, area, &mut state);
    }

    fn draw_join(&self, frame: &mut Frame, area: Rect) {
        let lines = vec![
            Line::from("Enter Game ID to Join:"),
            Line::from(Span::styled(
                self.join_input.display(true),
                Style::default().fg(self.theme.accent),
            )),
        ];
        let box_area = centered_rect(56, 4, area);
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Join Game"));
        frame.render_widget(paragraph, box_area);
    }

    fn draw_configure(&self, frame: &mut Frame, area: Rect) {
        let Some(state) = &self.configure else {
            frame.render_widget(
                Paragraph::new("No game selected.").block(Block::default().borders(Borders::ALL)),
                area,
            );
            return;
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let label = Style::default().fg(self.theme.muted);
        let value = Style::default()
            .fg(self.theme.accent)
            .add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Ship Size: ", label),
                Span::styled(state.size().to_string(), value),
            ]),
            Line::from(vec![
                Span::styled("Direction: ", label),
                Span::styled(state.orientation.to_string(), value),
            ]),
            Line::from(vec![
                Span::styled("Position: ", label),
                Span::styled(
                    state.anchor.label(),
                    value,
                ),
            ]),
            Line::from(""),
        ];
        if state.staging.is_empty() {
            lines.push(Line::from(Span::styled(
                "No ships added yet.",
                Style::default().fg(self.theme.muted),
            )));
        }
        for (idx, ship) in state.staging.ships().iter().enumerate() {
            let text = format!("{}. {}", idx + 1, ship.describe());
            if idx == state.selected {
                lines.push(Line::from(Span::styled(
                    format!("▶ {text}"),
                    Style::default()
                        .fg(self.theme.selection_fg)
                        .bg(self.theme.selection_bg),
                )));
            } else {
                lines.push(Line::from(format!("  {text}")));
            }
        }
        if state.submitting {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("{} Sending configuration…", self.spinner()),
                Style::default().fg(self.theme.warning),
            )));
        }

        let title = format!("Fleet for {}", state.game_id);
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, columns[0]);

        let preview = board::classify(&state.preview(), &[], "", BoardSide::Own);
        let mut grid = grid_lines(&preview, &self.theme, Some(state.anchor));
        grid.push(Line::from(""));
        grid.push(legend_line(&self.theme));
        let paragraph = Paragraph::new(grid)
            .block(Block::default().borders(Borders::ALL).title("Anchors"));
        frame.render_widget(paragraph, columns[1]);
    }

    fn draw_game(&self, frame: &mut Frame, area: Rect) {
        let Some(state) = &self.game else {
            frame.render_widget(
                Paragraph::new("No game selected.").block(Block::default().borders(Borders::ALL)),
                area,
            );
            return;
        };
        let Some(view) = state.view() else {
            let text = if state.loading {
                format!("{} Loading…", self.spinner())
            } else {
                "No game details available.".to_string()
            };
            frame.render_widget(
                Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Game")),
                area,
            );
            return;
        };
        let game = view.game();

        let mut info = vec![
            Line::from(format!("Game ID: {}", game.id)),
            Line::from(format!("Status: {}", game.status)),
            Line::from(Span::styled(
                view.turn_line().to_string(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
        ];
        if view.can_configure() {
            info.push(Line::from(Span::styled(
                "[c] Configure Table",
                Style::default().fg(self.theme.success),
            )));
        }
        if view.accepts_strikes() {
            info.push(Line::from(format!(
                "Select a cell to hit: {}   [Enter] Strike",
                state.target.label()
            )));
        }

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(info.len() as u16 + 2), Constraint::Min(3)])
            .split(area);
        frame.render_widget(
            Paragraph::new(info).block(Block::default().borders(Borders::ALL).title("Game")),
            layout[0],
        );

        if !view.shows_boards() {
            return;
        }
        let boards = view.boards();
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout[1]);

        let mut own = grid_lines(&boards.own, &self.theme, None);
        own.push(Line::from(""));
        own.push(legend_line(&self.theme));
        frame.render_widget(
            Paragraph::new(own).block(Block::default().borders(Borders::ALL).title("Your Fleet")),
            halves[0],
        );

        let cursor = view.accepts_strikes().then_some(state.target);
        let opponent = grid_lines(&boards.opponent, &self.theme, cursor);
        frame.render_widget(
            Paragraph::new(opponent)
                .block(Block::default().borders(Borders::ALL).title("Opponent Waters")),
            halves[1],
        );
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let secondary = Span::styled(self.screen.hints(), Style::default().fg(self.theme.muted));
        let paragraph = Paragraph::new(vec![Line::from(self.status.clone()), Line::from(secondary)])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_alert(&self, frame: &mut Frame, alert: &Alert) {
        let area = frame.size();
        let width = 56u16.min(area.width.saturating_sub(4)).max(20);
        let popup = centered_rect(width, 7, area);
        frame.render_widget(Clear, popup);

        let lines = vec![
            Line::from(alert.message.clone()),
            Line::from(""),
            Line::from(Span::styled(
                "[Enter] OK",
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(alert.title.clone())
                    .border_style(Style::default().fg(self.theme.warning)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup);
    }
}

fn edit_field(field: &mut TextField, code: KeyCode) {
    match code {
        KeyCode::Char(ch) => field.insert(ch),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Delete => field.delete(),
        KeyCode::Left => field.move_cursor(-1),
        KeyCode::Right => field.move_cursor(1),
        KeyCode::Home => field.move_home(),
        KeyCode::End => field.move_end(),
        _ => {}
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use salvo_core::{
        api::StatusCode,
        models::{GameStatus, ShipPlacement, User},
    };
    use tempfile::{tempdir, TempDir};

    fn app(session: Option<Session>) -> Result<(SalvoApp, TempDir)> {
        app_polling_every(session, AppConfig::default().poll_interval_ms)
    }

    fn app_polling_every(
        session: Option<Session>,
        poll_interval_ms: u64,
    ) -> Result<(SalvoApp, TempDir)> {
        let dir = tempdir()?;
        let config = AppConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            poll_interval_ms,
            request_timeout_secs: 1,
            data_dir: dir.path().to_path_buf(),
            log_dir: dir.path().join("logs"),
            ..AppConfig::default()
        };
        let client = ApiClient::new(&config)?;
        let store = SessionStore::new(config.session_path());
        Ok((SalvoApp::new(config, client, store, session), dir))
    }

    fn session() -> Session {
        Session::new("tok-1", "a@b.com")
    }

    fn game(status: GameStatus) -> Game {
        Game {
            id: "g1".to_string(),
            status,
            player1_id: Some("u1".to_string()),
            player2_id: Some("u2".to_string()),
            player_to_move_id: Some("u1".to_string()),
            ships_coord: Vec::new(),
            moves: Vec::new(),
        }
    }

    fn render(app: &mut SalvoApp) -> Result<String> {
        let mut terminal = Terminal::new(TestBackend::new(120, 48))?;
        terminal.draw(|frame| app.draw(frame))?;
        let buffer = terminal.backend().buffer();
        Ok(buffer.content().iter().map(|cell| cell.symbol()).collect())
    }

    fn subscription(app: &SalvoApp) -> u64 {
        app.game
            .as_ref()
            .and_then(|game| game.poller.as_ref())
            .map(|poller| poller.subscription())
            .expect("game view should be polling")
    }

    #[tokio::test]
    async fn status_change_between_ticks_shows_configure_action() -> Result<()> {
        let (mut app, _dir) = app(Some(session()))?;
        app.open_game("g1".to_string());
        assert_eq!(app.screen, Screen::Game);
        let id = subscription(&app);

        app.handle_poll_update(PollUpdate {
            subscription: id,
            result: Ok(game(GameStatus::Created)),
        });
        let screen = render(&mut app)?;
        assert!(screen.contains("Status: CREATED"));
        assert!(screen.contains("Waiting for a 2nd player..."));
        assert!(!screen.contains("Configure Table"));

        app.handle_poll_update(PollUpdate {
            subscription: id,
            result: Ok(game(GameStatus::MapConfig)),
        });
        let screen = render(&mut app)?;
        assert!(screen.contains("Status: MAP_CONFIG"));
        assert!(screen.contains("[c] Configure Table"));
        Ok(())
    }

    #[tokio::test]
    async fn updates_after_leaving_game_are_discarded() -> Result<()> {
        let (mut app, _dir) = app(Some(session()))?;
        app.open_game("g1".to_string());
        let id = subscription(&app);

        app.go_back();
        app.handle_poll_update(PollUpdate {
            subscription: id,
            result: Ok(game(GameStatus::Active)),
        });
        assert!(app.game.as_ref().and_then(|game| game.game.as_ref()).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn join_unauthorized_opens_requested_game() -> Result<()> {
        let (mut app, _dir) = app(Some(session()))?;
        app.handle_api_event(ApiEvent::Joined {
            requested: "g9".to_string(),
            result: Err(ApiError::Unauthorized {
                status: StatusCode::UNAUTHORIZED,
                message: "Unauthorized".to_string(),
            }),
        });
        assert_eq!(app.screen, Screen::Game);
        assert_eq!(app.game.as_ref().map(|game| game.game_id.as_str()), Some("g9"));
        assert!(app.alert.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn join_failure_stays_put_with_alert() -> Result<()> {
        let (mut app, _dir) = app(Some(session()))?;
        app.handle_api_event(ApiEvent::Joined {
            requested: "g9".to_string(),
            result: Err(ApiError::Status {
                status: StatusCode::NOT_FOUND,
                message: "Not Found".to_string(),
            }),
        });
        assert_eq!(app.screen, Screen::UserDetails);
        assert_eq!(
            app.alert.as_ref().map(|alert| alert.title.as_str()),
            Some("Failed to join game.")
        );
        Ok(())
    }

    #[tokio::test]
    async fn invalid_fleet_is_not_submitted() -> Result<()> {
        let (mut app, _dir) = app(Some(session()))?;
        let mut state = ConfigureState::new("g1".to_string());
        state.staging.push(ShipPlacement {
            x: "Z".to_string(),
            y: 1,
            size: 2,
            direction: "HORIZONTAL".to_string(),
        });
        app.configure = Some(state);

        app.send_configuration();

        let state = app.configure.as_ref().expect("configure state kept");
        assert!(!state.submitting);
        assert_eq!(state.staging.len(), 1);
        assert_eq!(
            app.alert.as_ref().map(|alert| alert.title.as_str()),
            Some("Invalid ship configuration")
        );
        Ok(())
    }

    #[tokio::test]
    async fn rejected_fleet_is_preserved_and_accepted_fleet_cleared() -> Result<()> {
        let (mut app, _dir) = app(Some(session()))?;
        let mut state = ConfigureState::new("g1".to_string());
        state.add_ship();
        state.submitting = true;
        app.configure = Some(state);

        app.handle_api_event(ApiEvent::Configured {
            game_id: "g1".to_string(),
            result: Err(ApiError::Status {
                status: StatusCode::BAD_REQUEST,
                message: "Ships overlap".to_string(),
            }),
        });
        assert_eq!(app.configure.as_ref().map(|s| s.staging.len()), Some(1));
        assert_eq!(
            app.alert.as_ref().map(|alert| alert.message.as_str()),
            Some("Ships overlap")
        );

        app.handle_api_event(ApiEvent::Configured {
            game_id: "g1".to_string(),
            result: Ok(()),
        });
        assert_eq!(app.configure.as_ref().map(|s| s.staging.len()), Some(0));
        Ok(())
    }

    #[tokio::test]
    async fn successful_strike_alerts_and_refetches_at_once() -> Result<()> {
        let (mut app, _dir) = app_polling_every(Some(session()), 3_600_000)?;
        let mut poll_rx = app.poll_rx.take().context("poll receiver")?;
        app.open_game("g1".to_string());
        let id = subscription(&app);

        // The first tick of the interval fires immediately.
        let first = tokio::time::timeout(Duration::from_secs(5), poll_rx.recv())
            .await?
            .context("poller closed")?;
        assert_eq!(first.subscription, id);

        let mut struck = game(GameStatus::Active);
        struck.player_to_move_id = Some("u2".to_string());
        app.handle_api_event(ApiEvent::Struck {
            game_id: "g1".to_string(),
            target: "C7".to_string(),
            result: Ok(struck.clone()),
        });

        assert_eq!(
            app.alert.as_ref().map(|alert| alert.title.as_str()),
            Some("Strike Made")
        );
        assert_eq!(
            app.alert.as_ref().map(|alert| alert.message.as_str()),
            Some("You have struck at C7")
        );
        assert_eq!(app.game.as_ref().and_then(|game| game.game.clone()), Some(struck));

        let extra = tokio::time::timeout(Duration::from_secs(5), poll_rx.recv())
            .await?
            .context("poller closed")?;
        assert_eq!(extra.subscription, id);
        Ok(())
    }

    #[tokio::test]
    async fn strike_out_of_turn_is_refused_locally() -> Result<()> {
        let (mut app, _dir) = app(Some(session()))?;
        app.open_game("g1".to_string());
        let id = subscription(&app);
        if let Some(state) = app.game.as_mut() {
            state.viewer_id = Some("u2".to_string());
        }
        app.handle_poll_update(PollUpdate {
            subscription: id,
            result: Ok(game(GameStatus::Active)),
        });

        app.strike();
        assert_eq!(
            app.alert.as_ref().map(|alert| alert.title.as_str()),
            Some("Not your turn")
        );
        Ok(())
    }

    #[tokio::test]
    async fn profile_view_shows_counters() -> Result<()> {
        let (mut app, _dir) = app(Some(session()))?;
        app.handle_api_event(ApiEvent::Profile(Ok(UserDetails {
            user: User {
                id: "u1".to_string(),
                email: "a@b.com".to_string(),
            },
            games_played: 3,
            games_won: 1,
            games_lost: 2,
            currently_games_playing: 1,
        })));

        let screen = render(&mut app)?;
        assert!(screen.contains("Email: a@b.com"));
        assert!(screen.contains("ID: u1"));
        assert!(screen.contains("Games Played: 3"));
        assert!(screen.contains("Games Won: 1"));
        assert!(screen.contains("Games Lost: 2"));
        assert!(screen.contains("Live Games: 1"));
        Ok(())
    }

    #[tokio::test]
    async fn login_persists_session_and_logout_clears_it() -> Result<()> {
        let (mut app, _dir) = app(None)?;
        assert_eq!(app.screen, Screen::Register);

        app.handle_api_event(ApiEvent::LoggedIn(Ok(session())));
        assert_eq!(app.screen, Screen::UserDetails);
        assert!(app.store.load()?.is_some());

        app.logout();
        assert_eq!(app.screen, Screen::Login);
        assert!(app.session.is_none());
        assert!(app.store.load()?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn restored_session_reports_sign_in_time() -> Result<()> {
        let restored = session();
        let since = restored
            .logged_in_at()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        let (app, _dir) = app(Some(restored))?;
        assert_eq!(app.screen, Screen::UserDetails);
        assert_eq!(app.status, format!("Signed in as a@b.com since {since}"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_session_redirects_to_login() -> Result<()> {
        let (mut app, _dir) = app(None)?;
        app.navigate(Screen::Lobby);
        assert_eq!(app.screen, Screen::Login);
        assert_eq!(
            app.alert.as_ref().map(|alert| alert.title.as_str()),
            Some("Not logged in")
        );
        Ok(())
    }
}
