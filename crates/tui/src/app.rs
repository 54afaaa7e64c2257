use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gamestore_core::{
    catalog::{sort_games, CatalogStore, CatalogSync, RatingShelf, SortOrder, SyncEvent},
    config::AppConfig,
    detail::{GalleryCursor, PaymentMethod, PurchaseOrder, Quantity},
    models::{Game, GameDetail, Requirements},
    pricing::line_total,
    recommend::mean_discounted_price,
    window::PageWindow,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc};
use tracing::{error, info};

use crate::format::{format_brl, join_or, release_label, stars, truncate, PriceTag};

const TICK_RATE: Duration = Duration::from_millis(250);
const SHELF_HEIGHT: u16 = 7;
const RECOMMENDATION_HEIGHT: u16 = 5;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::LightGreen,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Store,
    Ratings,
    Detail,
}

enum AppEvent {
    Input(Event),
    Tick,
    DetailLoaded(GameDetail),
}

/// One age-rating carousel and its visible window.
struct ShelfState {
    shelf: RatingShelf,
    window: PageWindow,
    card: usize,
}

impl ShelfState {
    fn new(shelf: RatingShelf, page_size: usize) -> Self {
        Self {
            shelf,
            window: PageWindow::new(page_size),
            card: 0,
        }
    }

    fn total(&self) -> usize {
        self.shelf.games.len()
    }

    fn visible(&self) -> &[Game] {
        self.window.visible(&self.shelf.games)
    }

    fn selected(&self) -> Option<&Game> {
        self.visible().get(self.card)
    }

    fn next_page(&mut self) -> bool {
        let moved = self.window.advance(self.total(), self.window.size);
        let changed = moved != self.window;
        self.window = moved;
        self.clamp_card();
        changed
    }

    fn prev_page(&mut self) -> bool {
        let moved = self.window.retreat(self.window.size);
        let changed = moved != self.window;
        self.window = moved;
        self.clamp_card();
        changed
    }

    fn move_card(&mut self, delta: isize) {
        let visible = self.visible().len();
        if visible == 0 {
            self.card = 0;
            return;
        }
        let idx = (self.card as isize + delta).clamp(0, visible as isize - 1);
        self.card = idx as usize;
    }

    fn clamp_card(&mut self) {
        self.card = self.card.min(self.visible().len().saturating_sub(1));
    }
}

#[derive(Default)]
struct CarouselState {
    shelves: Vec<ShelfState>,
    cursor: usize,
}

impl CarouselState {
    fn rebuild(&mut self, shelves: Vec<RatingShelf>, page_size: usize) {
        self.shelves = shelves
            .into_iter()
            .map(|shelf| ShelfState::new(shelf, page_size))
            .collect();
        self.cursor = self.cursor.min(self.shelves.len().saturating_sub(1));
    }

    fn current(&self) -> Option<&ShelfState> {
        self.shelves.get(self.cursor)
    }

    fn current_mut(&mut self) -> Option<&mut ShelfState> {
        self.shelves.get_mut(self.cursor)
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.shelves.is_empty() {
            return;
        }
        let idx = (self.cursor as isize + delta).clamp(0, self.shelves.len() as isize - 1);
        self.cursor = idx as usize;
    }
}

struct DetailState {
    detail: GameDetail,
    loading: bool,
    images: Vec<String>,
    gallery: GalleryCursor,
    quantity: Quantity,
    return_to: Screen,
}

impl DetailState {
    fn new(game: Game, max_quantity: u32, return_to: Screen) -> Self {
        let images = game.gallery();
        Self {
            gallery: GalleryCursor::new(images.len()),
            images,
            quantity: Quantity::new(max_quantity),
            loading: true,
            return_to,
            detail: GameDetail {
                game,
                age_rating: None,
                requirements: None,
            },
        }
    }

    fn game(&self) -> &Game {
        &self.detail.game
    }

    /// Swap in a newer record for the same game, keeping the gallery
    /// position when it still exists.
    fn replace_game(&mut self, game: Game) {
        let index = self.gallery.index();
        self.images = game.gallery();
        self.gallery = GalleryCursor::new(self.images.len());
        self.gallery.select(index);
        self.detail.game = game;
    }
}

struct PurchaseModal {
    order: PurchaseOrder,
    cursor: Option<usize>,
}

impl PurchaseModal {
    fn move_cursor(&mut self, delta: isize) {
        let options = PaymentMethod::ALL.len() as isize;
        let next = match self.cursor {
            None if delta > 0 => 0,
            None => options - 1,
            Some(current) => (current as isize + delta).clamp(0, options - 1),
        };
        self.cursor = Some(next as usize);
        self.order.method = self.cursor.map(|idx| PaymentMethod::ALL[idx]);
    }
}

/// Storefront application state and event loop.
pub struct StoreApp {
    config: AppConfig,
    store: CatalogStore,
    sync: CatalogSync,
    state: UiState,
    screen: Screen,
    carousel: CarouselState,
    recommendations: Vec<Game>,
    detail: Option<DetailState>,
    purchase: Option<PurchaseModal>,
    pending_sync: bool,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    sync_tx: Option<mpsc::Sender<SyncEvent>>,
    sync_rx: Option<mpsc::Receiver<SyncEvent>>,
    theme: Theme,
}

impl StoreApp {
    pub fn new(config: AppConfig, store: CatalogStore, sync: CatalogSync) -> Self {
        Self {
            config,
            store,
            sync,
            state: UiState::default(),
            screen: Screen::Store,
            carousel: CarouselState::default(),
            recommendations: Vec::new(),
            detail: None,
            purchase: None,
            pending_sync: true,
            event_tx: None,
            sync_tx: None,
            sync_rx: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.reload_views();
        self.state
            .set_status(format!("Loading catalog from {}…", self.config.api_base_url));

        let (event_tx, event_rx) = mpsc::channel::<AppEvent>(128);
        forward_terminal_events(event_tx.clone())?;
        self.event_tx = Some(event_tx);

        let mut terminal = enter_terminal()?;
        let outcome = self.event_loop(&mut terminal, event_rx).await;
        leave_terminal(terminal)?;
        self.event_tx = None;
        outcome
    }

    async fn event_loop(
        &mut self,
        terminal: &mut StoreTerminal,
        mut event_rx: mpsc::Receiver<AppEvent>,
    ) -> Result<()> {
        let mut sync_rx = self.sync_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            if let Some(rx) = sync_rx.as_mut() {
                let mut sync_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    maybe_sync = rx.recv() => {
                        match maybe_sync {
                            Some(event) => self.handle_sync_event(event),
                            None => sync_closed = true,
                        }
                    }
                }
                if sync_closed {
                    sync_rx = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event) {
                    break;
                }
            }

            if self.state.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Wire the catalog sync channel. The sender is kept for manual refetches.
    pub fn attach_sync(
        &mut self,
        sender: mpsc::Sender<SyncEvent>,
        receiver: mpsc::Receiver<SyncEvent>,
    ) {
        self.sync_tx = Some(sender);
        self.sync_rx = Some(receiver);
    }

    fn reload_views(&mut self) {
        self.state.refresh(&self.store);
        self.carousel
            .rebuild(self.store.shelves(), self.config.carousel_page_size);
        self.recommendations = self.store.recommendations(self.config.recommendation_count);
        info!(
            total = self.state.catalog_size,
            shelves = self.carousel.shelves.len(),
            recommendations = self.recommendations.len(),
            "Views rebuilt"
        );
    }

    fn request_sync(&mut self) {
        if self.pending_sync {
            self.state
                .set_status("Catalog refresh already in progress".to_string());
            return;
        }
        let Some(sender) = self.sync_tx.clone() else {
            self.state
                .set_status("Internal error: sync channel unavailable".to_string());
            error!("sync_channel_missing");
            return;
        };
        self.pending_sync = true;
        self.state.set_status("Refreshing catalog…".to_string());
        let sync = self.sync.clone();
        spawn(async move {
            if let Err(err) = sync.run(sender).await {
                error!("Catalog sync task error: {err}");
            }
        });
    }

    fn handle_tick(&mut self) {
        if self.state.mode == Mode::Filter {
            self.state
                .set_status(format!("Filter: {}", self.state.filter));
        }
    }

    fn handle_sync_event(&mut self, event: SyncEvent) {
        self.pending_sync = false;
        match event {
            SyncEvent::Success { snapshot } => {
                info!(
                    source = %snapshot.source,
                    games = snapshot.games.len(),
                    "Sync succeeded"
                );
                self.store.replace(snapshot);
                self.reload_views();
                if let Some(open) = self.detail.as_mut() {
                    if let Some(fresh) = self.store.game(&open.game().id) {
                        open.replace_game(fresh);
                    }
                }
                self.state
                    .set_status(format!("Loaded {} games", self.state.catalog_size));
            }
            SyncEvent::Error(err) => {
                error!(?err, "Catalog sync failed");
                self.state
                    .set_status(format!("Failed to load catalog: {err:#}"));
            }
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::DetailLoaded(loaded)) => {
                match self.detail.as_mut() {
                    Some(current) if current.game().id == loaded.game.id => {
                        info!(game_id = %loaded.game.id, "Detail loaded");
                        let GameDetail {
                            game,
                            age_rating,
                            requirements,
                        } = loaded;
                        current.replace_game(game);
                        current.detail.age_rating = age_rating;
                        current.detail.requirements = requirements;
                        current.loading = false;
                    }
                    _ => {
                        info!(game_id = %loaded.game.id, "Discarding stale detail");
                    }
                }
                true
            }
            None => false,
        }
    }

    fn open_detail(&mut self, game: Game) {
        let Some(sender) = self.event_tx.clone() else {
            self.state
                .set_status("Internal error: event channel unavailable".to_string());
            error!("event_channel_missing");
            return;
        };

        info!(game_id = %game.id, name = %game.name, "Opening detail");
        let return_to = if self.screen == Screen::Detail {
            Screen::Store
        } else {
            self.screen
        };
        self.detail = Some(DetailState::new(
            game.clone(),
            self.config.max_quantity,
            return_to,
        ));
        self.purchase = None;
        self.screen = Screen::Detail;
        self.state.set_status(format!("Loading details for {}…", game.name));

        let client = self.sync.client().clone();
        spawn(async move {
            let detail = client.detail(game).await;
            let _ = sender.send(AppEvent::DetailLoaded(detail)).await;
        });
    }

    fn close_detail(&mut self) {
        let return_to = self
            .detail
            .take()
            .map(|detail| detail.return_to)
            .unwrap_or(Screen::Store);
        self.purchase = None;
        self.screen = return_to;
        self.state.set_status("Back to the store".to_string());
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if self.purchase.is_some() {
            return self.handle_purchase_key(key);
        }
        match self.screen {
            Screen::Store => self.handle_store_key(key),
            Screen::Ratings => self.handle_ratings_key(key),
            Screen::Detail => self.handle_detail_key(key),
        }
    }

    fn handle_store_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.state.mode {
            Mode::Filter => self.handle_filter_key(key),
            Mode::Browse => self.handle_browse_key(key),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = Mode::Browse;
                self.state.filter.clear();
                self.state.refresh(&self.store);
                self.state.set_status("Filter cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                self.state.set_status(format!(
                    "Filter applied: {} ({} games)",
                    self.state.filter,
                    self.state.games.len()
                ));
            }
            KeyCode::Backspace => {
                self.state.filter.pop();
                self.state.refresh(&self.store);
                self.state
                    .set_status(format!("Filter: {}", self.state.filter));
            }
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    self.state.filter.push(c);
                    self.state.refresh(&self.store);
                    self.state
                        .set_status(format!("Filter: {}", self.state.filter));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.step(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.step(-1),
            KeyCode::Char('g') if key.modifiers.is_empty() => self.state.select(0),
            KeyCode::Home => self.state.select(0),
            KeyCode::Char('G') | KeyCode::End => self.state.select(usize::MAX),
            KeyCode::PageDown => self.state.page(1),
            KeyCode::PageUp => self.state.page(-1),
            KeyCode::Char('/') => {
                self.state.mode = Mode::Filter;
                self.state.set_status("Enter filter text".to_string());
            }
            KeyCode::Char('s') if key.modifiers.is_empty() => {
                self.state.sort = self.state.sort.next();
                self.state.refresh(&self.store);
                self.state
                    .set_status(format!("Sorted by {}", self.state.sort.label()));
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.request_sync();
            }
            KeyCode::Char(digit @ '1'..='9') => {
                let index = digit as usize - '1' as usize;
                match self.recommendations.get(index).cloned() {
                    Some(game) => self.open_detail(game),
                    None => self
                        .state
                        .set_status(format!("No recommendation #{digit}")),
                }
            }
            KeyCode::Tab => {
                self.screen = Screen::Ratings;
                self.state
                    .set_status(format!("{} age ratings", self.carousel.shelves.len()));
            }
            KeyCode::Enter => match self.state.current_game().cloned() {
                Some(game) => self.open_detail(game),
                None => self.state.set_status("No game selected".to_string()),
            },
            _ => {}
        }
        Ok(())
    }

    fn handle_ratings_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Tab | KeyCode::Esc => {
                self.screen = Screen::Store;
                self.state.set_status("Back to the store".to_string());
            }
            KeyCode::Char('j') | KeyCode::Down => self.carousel.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.carousel.move_cursor(-1),
            KeyCode::Char('h') | KeyCode::Left => {
                if let Some(shelf) = self.carousel.current_mut() {
                    shelf.move_card(-1);
                }
            }
            KeyCode::Char('l') | KeyCode::Right => {
                if let Some(shelf) = self.carousel.current_mut() {
                    shelf.move_card(1);
                }
            }
            KeyCode::Char(']') | KeyCode::PageDown => {
                if let Some(shelf) = self.carousel.current_mut() {
                    if !shelf.next_page() {
                        self.state.set_status("Already on the last page".to_string());
                    }
                }
            }
            KeyCode::Char('[') | KeyCode::PageUp => {
                if let Some(shelf) = self.carousel.current_mut() {
                    if !shelf.prev_page() {
                        self.state.set_status("Already on the first page".to_string());
                    }
                }
            }
            KeyCode::Enter => {
                let selected = self
                    .carousel
                    .current()
                    .and_then(|shelf| shelf.selected())
                    .cloned();
                match selected {
                    Some(game) => self.open_detail(game),
                    None => self.state.set_status("No game selected".to_string()),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_detail_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(detail) = self.detail.as_mut() else {
            self.screen = Screen::Store;
            return Ok(());
        };
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Esc | KeyCode::Backspace => self.close_detail(),
            KeyCode::Char('h') | KeyCode::Left => detail.gallery.prev(),
            KeyCode::Char('l') | KeyCode::Right => detail.gallery.next(),
            KeyCode::Char(digit @ '1'..='9') => {
                let index = digit as usize - '1' as usize;
                if index < detail.gallery.len() {
                    detail.gallery.select(index);
                } else {
                    self.state.set_status(format!("No image #{digit}"));
                }
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                if !detail.quantity.increment() {
                    self.state.set_status(format!(
                        "At most {} copies per purchase",
                        self.config.max_quantity
                    ));
                }
            }
            KeyCode::Char('-') => {
                if !detail.quantity.decrement() {
                    self.state
                        .set_status("At least one copy is required".to_string());
                }
            }
            KeyCode::Char('b') | KeyCode::Enter => {
                let order = PurchaseOrder::new(detail.game(), detail.quantity);
                info!(game_id = %order.game_id, quantity = order.quantity, "Checkout opened");
                self.purchase = Some(PurchaseModal {
                    order,
                    cursor: None,
                });
                self.state
                    .set_status("Choose a payment method".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_purchase_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(modal) = self.purchase.as_mut() else {
            return Ok(());
        };
        match key.code {
            KeyCode::Esc => {
                self.purchase = None;
                self.state.set_status("Purchase cancelled".to_string());
            }
            KeyCode::Char('j') | KeyCode::Down => modal.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => modal.move_cursor(-1),
            KeyCode::Enter => match modal.order.confirm() {
                Ok(ack) => {
                    self.state.set_status(format!(
                        "{} ({} via {})",
                        ack.message(),
                        format_brl(ack.total),
                        ack.method
                    ));
                    self.purchase = None;
                }
                Err(err) => self.state.set_status(format!("Cannot confirm: {err}")),
            },
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        match self.screen {
            Screen::Store => self.draw_store(frame),
            Screen::Ratings => self.draw_ratings(frame),
            Screen::Detail => self.draw_detail(frame),
        }
        if let Some(modal) = &self.purchase {
            self.render_purchase_modal(frame, modal);
        }
    }

    fn draw_store(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(RECOMMENDATION_HEIGHT),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[1]);

        self.render_recommendations(frame, chunks[0]);
        self.render_game_list(frame, body[0]);
        self.render_game_summary(frame, body[1]);
        self.render_status(frame, chunks[2]);
    }

    fn render_recommendations(&self, frame: &mut Frame, area: Rect) {
        let title = match mean_discounted_price(&self.store.games()) {
            Some(mean) => format!("Recommended · around {}", format_brl(mean)),
            None => "Recommended".to_string(),
        };
        let block = Block::default().borders(Borders::ALL).title(title);
        if self.recommendations.is_empty() {
            let message = if self.store.is_loaded() {
                "No paid games to recommend"
            } else {
                "Loading…"
            };
            let paragraph = Paragraph::new(Span::styled(
                message,
                Style::default().fg(self.theme.muted),
            ))
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let inner = block.inner(area);
        frame.render_widget(block, area);
        let count = self.recommendations.len() as u32;
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                (0..count)
                    .map(|_| Constraint::Ratio(1, count))
                    .collect::<Vec<_>>(),
            )
            .split(inner);

        for (idx, (game, column)) in self.recommendations.iter().zip(columns.iter()).enumerate() {
            let width = column.width.saturating_sub(4) as usize;
            let lines = vec![
                Line::from(vec![
                    Span::styled(
                        format!("{} ", idx + 1),
                        Style::default().fg(self.theme.warning),
                    ),
                    Span::styled(
                        truncate(&game.name, width),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(self.price_spans(game)),
            ];
            frame.render_widget(Paragraph::new(lines), *column);
        }
    }

    fn render_game_list(&mut self, frame: &mut Frame, area: Rect) {
        self.state.resize(area.height.saturating_sub(2) as usize);

        let mut list_state = ListState::default();
        let games = self.state.visible_games();
        if !games.is_empty() {
            list_state.select(Some(self.state.cursor - self.state.window.start));
        }
        let items: Vec<ListItem> = games
            .iter()
            .enumerate()
            .map(|(idx, game)| {
                let marker = if self.state.cursor == self.state.window.absolute(idx) {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                let mut line = vec![
                    marker,
                    Span::styled(
                        game.name.clone(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw("  "),
                ];
                line.extend(self.price_spans(game));
                ListItem::new(Line::from(line))
            })
            .collect();

        let title = format!(
            "Games ({}) · {}",
            self.state.games.len(),
            self.state.sort.label()
        );
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_game_summary(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Game");
        let Some(game) = self.state.current_game() else {
            let message = if self.store.is_loaded() {
                "No games match"
            } else {
                "Catalog not loaded yet"
            };
            frame.render_widget(Paragraph::new(message).block(block), area);
            return;
        };

        let mut lines = vec![
            Line::from(Span::styled(
                game.name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(self.price_spans(game)),
            Line::from(format!(
                "{} {:.1}",
                stars(game.rating),
                game.rating.unwrap_or(0.0)
            )),
            Line::from(format!("Released: {}", release_label(game))),
            Line::from(format!("Genres: {}", join_or(&game.genres, "n/a"))),
            Line::from(format!("Categories: {}", join_or(&game.categories, "n/a"))),
            Line::from(""),
        ];
        let synopsis = game
            .synopsis
            .clone()
            .unwrap_or_else(|| "No synopsis available.".to_string());
        lines.push(Line::from(Span::styled(
            synopsis,
            Style::default().fg(self.theme.muted),
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter: details · Tab: age ratings · 1-9: recommendation",
            Style::default().fg(self.theme.muted),
        )));

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn draw_ratings(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(SHELF_HEIGHT), Constraint::Length(4)])
            .split(size);
        let area = chunks[0];

        if self.carousel.shelves.is_empty() {
            let message = if self.store.is_loaded() {
                "No age ratings with games"
            } else {
                "Catalog not loaded yet"
            };
            let paragraph = Paragraph::new(message).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Games by age rating"),
            );
            frame.render_widget(paragraph, area);
            self.render_status(frame, chunks[1]);
            return;
        }

        let fits = (area.height / SHELF_HEIGHT).max(1) as usize;
        let shelf_window = PageWindow {
            start: self.carousel.cursor.saturating_sub(fits - 1),
            size: fits,
        };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                (0..fits)
                    .map(|_| Constraint::Length(SHELF_HEIGHT))
                    .collect::<Vec<_>>(),
            )
            .split(area);

        for (offset, (shelf, row)) in shelf_window
            .visible(&self.carousel.shelves)
            .iter()
            .zip(rows.iter())
            .enumerate()
        {
            let focused = shelf_window.absolute(offset) == self.carousel.cursor;
            self.render_shelf(frame, *row, shelf, focused);
        }
        self.render_status(frame, chunks[1]);
    }

    fn render_shelf(&self, frame: &mut Frame, area: Rect, shelf: &ShelfState, focused: bool) {
        let left = if shelf.window.can_retreat() { "◀ " } else { "  " };
        let right = if shelf.window.can_advance(shelf.total()) {
            " ▶"
        } else {
            "  "
        };
        let title = format!(
            "{left}{} {}{right}",
            shelf.shelf.rating.display_label(),
            shelf.window.page_label(shelf.total())
        );
        let border_style = if focused {
            Style::default().fg(self.theme.accent)
        } else {
            Style::default().fg(self.theme.muted)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let slots = shelf.window.size.max(1) as u32;
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                (0..slots)
                    .map(|_| Constraint::Ratio(1, slots))
                    .collect::<Vec<_>>(),
            )
            .split(inner);

        for (idx, (game, column)) in shelf.visible().iter().zip(columns.iter()).enumerate() {
            let selected = focused && idx == shelf.card;
            let name_style = if selected {
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED)
            } else {
                Style::default()
                    .fg(self.theme.primary_fg)
                    .add_modifier(Modifier::BOLD)
            };
            let width = column.width.saturating_sub(1) as usize;
            let tag = PriceTag::for_game(game);
            let mut lines = vec![
                Line::from(Span::styled(truncate(&game.name, width), name_style)),
                Line::from(""),
            ];
            if let (Some(original), Some(badge)) = (tag.original.clone(), tag.badge.clone()) {
                lines.push(Line::from(vec![
                    Span::styled(
                        original,
                        Style::default()
                            .fg(self.theme.muted)
                            .add_modifier(Modifier::CROSSED_OUT),
                    ),
                    Span::raw(" "),
                    Span::styled(badge, Style::default().fg(self.theme.danger)),
                ]));
            }
            lines.push(Line::from(Span::styled(
                tag.current,
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )));
            frame.render_widget(Paragraph::new(lines), *column);
        }
    }

    fn draw_detail(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(4),
            ])
            .split(size);

        let Some(detail) = self.detail.as_ref() else {
            frame.render_widget(
                Paragraph::new("Game not found").block(Block::default().borders(Borders::ALL)),
                chunks[1],
            );
            self.render_status(frame, chunks[2]);
            return;
        };
        let game = detail.game();

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                game.name.clone(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                if detail.loading { "  (loading…)" } else { "" },
                Style::default().fg(self.theme.muted),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL).title("Esc: back"));
        frame.render_widget(header, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5),
                Constraint::Length(5),
                Constraint::Min(4),
                Constraint::Length(10),
            ])
            .split(body[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(9), Constraint::Length(8)])
            .split(body[1]);

        self.render_gallery(frame, left[0], detail);
        let synopsis = Paragraph::new(
            game.synopsis
                .clone()
                .unwrap_or_else(|| "No synopsis available.".to_string()),
        )
        .block(Block::default().borders(Borders::ALL).title("Synopsis"))
        .wrap(Wrap { trim: true });
        frame.render_widget(synopsis, left[1]);
        let description = Paragraph::new(
            game.description
                .clone()
                .unwrap_or_else(|| "No description available.".to_string()),
        )
        .block(Block::default().borders(Borders::ALL).title("Description"))
        .wrap(Wrap { trim: true });
        frame.render_widget(description, left[2]);
        self.render_requirements(frame, left[3], detail);
        self.render_detail_info(frame, right[0], detail);
        self.render_purchase_box(frame, right[1], detail);
        self.render_status(frame, chunks[2]);
    }

    fn render_gallery(&self, frame: &mut Frame, area: Rect, detail: &DetailState) {
        let title = if detail.gallery.can_cycle() {
            format!(
                "Image {}/{} · h/l or 1-9 to browse",
                detail.gallery.index() + 1,
                detail.gallery.len()
            )
        } else {
            "Image".to_string()
        };
        let url = detail
            .gallery
            .current(&detail.images)
            .unwrap_or("Image unavailable");
        let thumbnails: Vec<Span> = (0..detail.gallery.len())
            .map(|idx| {
                let style = if idx == detail.gallery.index() {
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
                } else {
                    Style::default().fg(self.theme.muted)
                };
                Span::styled(format!(" {} ", idx + 1), style)
            })
            .collect();
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(
                url.to_string(),
                Style::default().fg(self.theme.muted),
            )),
            Line::from(thumbnails),
        ])
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_requirements(&self, frame: &mut Frame, area: Rect, detail: &DetailState) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Minimum requirements");
        let Some(requirements) = detail.detail.requirements.as_ref() else {
            let message = if detail.loading {
                "Loading…"
            } else {
                "No requirements listed"
            };
            frame.render_widget(Paragraph::new(message).block(block), area);
            return;
        };
        let paragraph = Paragraph::new(requirement_lines(requirements))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_detail_info(&self, frame: &mut Frame, area: Rect, detail: &DetailState) {
        let game = detail.game();
        let rating_label = match detail.detail.age_rating.as_ref() {
            Some(rating) => rating.display_label(),
            None if detail.loading => "…".to_string(),
            None => "Not rated".to_string(),
        };
        let lines = vec![
            Line::from(vec![
                Span::styled(stars(game.rating), Style::default().fg(self.theme.warning)),
                Span::raw(format!(" {:.1}", game.rating.unwrap_or(0.0))),
            ]),
            Line::from(format!("Released: {}", release_label(game))),
            Line::from(format!("Genres: {}", join_or(&game.genres, "n/a"))),
            Line::from(format!("Categories: {}", join_or(&game.categories, "n/a"))),
            Line::from(format!("Age rating: {rating_label}")),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("About"))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_purchase_box(&self, frame: &mut Frame, area: Rect, detail: &DetailState) {
        let game = detail.game();
        let quantity = detail.quantity.get();
        let lines = vec![
            Line::from(self.price_spans(game)),
            Line::from(format!("Quantity: {quantity}  (+/-)")),
            Line::from(Span::styled(
                format!(
                    "Total: {}",
                    format_brl(line_total(game.price, game.discount_percent, quantity))
                ),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "b: buy now",
                Style::default().fg(self.theme.accent),
            )),
        ];
        let paragraph =
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Buy"));
        frame.render_widget(paragraph, area);
    }

    fn render_purchase_modal(&self, frame: &mut Frame, modal: &PurchaseModal) {
        let area = centered_rect(54, 14, frame.size());
        frame.render_widget(Clear, area);

        let order = &modal.order;
        let mut lines = vec![
            Line::from(Span::styled(
                order.game_name.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Quantity: {}", order.quantity)),
            Line::from(format!("Unit price: {}", format_brl(order.unit_price()))),
            Line::from(Span::styled(
                format!("Total: {}", format_brl(order.total())),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Payment method:"),
        ];
        if modal.cursor.is_none() {
            lines.push(Line::from(Span::styled(
                "  Select… (j/k)",
                Style::default().fg(self.theme.muted),
            )));
        }
        for (idx, method) in PaymentMethod::ALL.iter().enumerate() {
            if modal.cursor == Some(idx) {
                lines.push(Line::from(Span::styled(
                    format!("▶ {method}"),
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD),
                )));
            } else {
                lines.push(Line::from(format!("  {method}")));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter: confirm · Esc: cancel",
            Style::default().fg(self.theme.muted),
        )));

        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Checkout")
                .border_style(Style::default().fg(self.theme.accent)),
        );
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.screen == Screen::Store && self.state.mode == Mode::Filter {
            format!("Filter: {}", self.state.filter)
        } else {
            self.state.status.clone()
        };
        let snapshot_note = match self.store.fetched_at() {
            Some(at) => format!(
                "{} games · fetched {} from {}",
                self.state.catalog_size,
                at.format("%H:%M:%S UTC"),
                self.config.api_base_url
            ),
            None if self.pending_sync => "Fetching catalog…".to_string(),
            None => "Catalog unavailable · Ctrl-r to retry".to_string(),
        };
        let secondary = Span::styled(
            snapshot_note,
            Style::default().fg(if self.store.is_loaded() {
                self.theme.success
            } else {
                self.theme.muted
            }),
        );
        let paragraph = Paragraph::new(vec![Line::from(primary), Line::from(secondary)])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn price_spans(&self, game: &Game) -> Vec<Span<'static>> {
        let tag = PriceTag::for_game(game);
        if tag.free {
            return vec![Span::styled(
                tag.current,
                Style::default()
                    .fg(self.theme.success)
                    .add_modifier(Modifier::BOLD),
            )];
        }
        let mut spans = Vec::new();
        if let Some(original) = tag.original {
            spans.push(Span::styled(
                original,
                Style::default()
                    .fg(self.theme.muted)
                    .add_modifier(Modifier::CROSSED_OUT),
            ));
            spans.push(Span::raw(" "));
        }
        if let Some(badge) = tag.badge {
            spans.push(Span::styled(
                badge,
                Style::default()
                    .fg(self.theme.danger)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(
            tag.current,
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        ));
        spans
    }
}

fn requirement_lines(requirements: &Requirements) -> Vec<Line<'static>> {
    let field = |label: &str, value: &Option<String>| {
        Line::from(format!(
            "{label}: {}",
            value.as_deref().unwrap_or("Not specified")
        ))
    };
    let mut lines = vec![
        field("OS", &requirements.os),
        field("Processor", &requirements.cpu),
        field("Memory", &requirements.memory),
        field("Graphics", &requirements.gpu),
        field("Storage", &requirements.storage),
    ];
    if let Some(directx) = requirements.directx.as_deref() {
        lines.push(Line::from(format!("DirectX: {directx}")));
    }
    if let Some(notes) = requirements.notes.as_deref() {
        lines.push(Line::from(Span::styled(
            notes.to_string(),
            Style::default().add_modifier(Modifier::ITALIC),
        )));
    }
    lines
}

type StoreTerminal = Terminal<CrosstermBackend<io::Stdout>>;

fn enter_terminal() -> Result<StoreTerminal> {
    enable_raw_mode().context("failed to enter raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    let mut terminal =
        Terminal::new(CrosstermBackend::new(stdout)).context("failed to create terminal")?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    Ok(terminal)
}

fn leave_terminal(mut terminal: StoreTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")
}

/// Forward key presses and idle ticks from a dedicated thread until the
/// receiver goes away or the terminal stops answering.
fn forward_terminal_events(sender: mpsc::Sender<AppEvent>) -> Result<()> {
    let next_event = || -> io::Result<AppEvent> {
        Ok(if event::poll(TICK_RATE)? {
            AppEvent::Input(event::read()?)
        } else {
            AppEvent::Tick
        })
    };
    thread::Builder::new()
        .name("terminal-input".to_string())
        .spawn(move || {
            while let Ok(next) = next_event() {
                if sender.blocking_send(next).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn input thread")?;
    Ok(())
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

/// Store-screen listing: the filtered, sorted games plus the cursor and
/// the rows that fit on screen.
struct UiState {
    catalog_size: usize,
    games: Vec<Game>,
    cursor: usize,
    window: PageWindow,
    filter: String,
    sort: SortOrder,
    status: String,
    mode: Mode,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            catalog_size: 0,
            games: Vec::new(),
            cursor: 0,
            window: PageWindow::new(1),
            filter: String::new(),
            sort: SortOrder::default(),
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }
}

impl UiState {
    /// Re-run the filter and sort against `store`. The selected game stays
    /// selected when it is still listed.
    fn refresh(&mut self, store: &CatalogStore) {
        let selected = self.current_game().map(|game| game.id.clone());
        self.catalog_size = store.game_count();
        self.games = store.games_matching(&self.filter);
        sort_games(&mut self.games, self.sort);
        let index = selected
            .and_then(|id| self.games.iter().position(|game| game.id == id))
            .unwrap_or(0);
        self.window.start = 0;
        self.select(index);
    }

    fn resize(&mut self, rows: usize) {
        self.window.size = rows.max(1);
        self.select(self.cursor);
    }

    /// Put the cursor on `index`, clamped to the list, and scroll the
    /// window just enough to show it.
    fn select(&mut self, index: usize) {
        let Some(last) = self.games.len().checked_sub(1) else {
            self.cursor = 0;
            self.window.start = 0;
            return;
        };
        self.cursor = index.min(last);
        let window = self.window;
        self.window = if self.cursor < window.start {
            window.retreat(window.start - self.cursor)
        } else if self.cursor >= window.start + window.size {
            window.advance(self.games.len(), self.cursor + 1 - window.start - window.size)
        } else {
            window.advance(self.games.len(), 0)
        };
    }

    fn step(&mut self, delta: isize) {
        self.select(self.cursor.saturating_add_signed(delta));
    }

    fn page(&mut self, pages: isize) {
        self.step(pages * self.window.size as isize);
    }

    fn visible_games(&self) -> &[Game] {
        self.window.visible(&self.games)
    }

    fn current_game(&self) -> Option<&Game> {
        self.games.get(self.cursor)
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamestore_core::catalog::CatalogSnapshot;
    use serde_json::json;

    fn game(id: u32, name: &str, price: f64) -> Game {
        serde_json::from_value(json!({
            "CodJogo": id,
            "Nome": name,
            "Preco": price,
            "Desconto": 0,
            "CodFaixaEtaria": 1
        }))
        .expect("game decodes")
    }

    fn store_with(games: Vec<Game>) -> CatalogStore {
        let store = CatalogStore::new();
        store.replace(CatalogSnapshot {
            games,
            ..CatalogSnapshot::default()
        });
        store
    }

    fn numbered_store(count: u32) -> CatalogStore {
        store_with(
            (0..count)
                .map(|id| game(id, &format!("Game {id}"), 10.0 + f64::from(id)))
                .collect(),
        )
    }

    #[test]
    fn listing_filters_and_keeps_selection() {
        let store = store_with(vec![
            game(1, "Stardew Acres", 30.0),
            game(2, "Star Pilot", 20.0),
            game(3, "Cave Story", 10.0),
        ]);
        let mut state = UiState::default();
        state.refresh(&store);
        assert_eq!(state.catalog_size, 3);
        state.select(1);

        state.filter = "  STAR ".to_string();
        state.refresh(&store);
        assert_eq!(state.games.len(), 2);
        assert_eq!(state.current_game().map(|game| game.id.as_str()), Some("2"));

        state.sort = SortOrder::PriceLowHigh;
        state.refresh(&store);
        assert_eq!(state.games[0].name, "Star Pilot");
        assert_eq!(state.current_game().map(|game| game.id.as_str()), Some("2"));

        state.filter = "racing".to_string();
        state.refresh(&store);
        assert!(state.current_game().is_none());
        assert!(state.visible_games().is_empty());
        state.step(1);
        assert_eq!(state.cursor, 0);
    }

    #[test]
    fn cursor_scrolls_the_listing_window() {
        let mut state = UiState::default();
        state.refresh(&numbered_store(10));
        state.resize(3);

        state.select(5);
        assert_eq!((state.cursor, state.window.start), (5, 3));
        state.step(-4);
        assert_eq!((state.cursor, state.window.start), (1, 1));
        state.select(usize::MAX);
        assert_eq!((state.cursor, state.window.start), (9, 7));
        state.page(-1);
        assert_eq!((state.cursor, state.window.start), (6, 6));
        state.step(-20);
        assert_eq!((state.cursor, state.window.start), (0, 0));

        state.select(8);
        state.resize(20);
        assert_eq!(state.window.start, 0);
        assert_eq!(state.visible_games().len(), 10);
    }

    #[test]
    fn shelf_pages_by_window_size() {
        let games: Vec<Game> = (0..7).map(|id| game(id, "Shelf game", 5.0)).collect();
        let rating = gamestore_core::models::AgeRating {
            code: "1".to_string(),
            label: Some("Livre".to_string()),
        };
        let mut shelf = ShelfState::new(RatingShelf { rating, games }, 3);

        assert!(!shelf.prev_page());
        shelf.move_card(5);
        assert_eq!(shelf.card, 2);
        assert!(shelf.next_page());
        assert_eq!(shelf.window.start, 3);
        assert!(shelf.next_page());
        assert_eq!(shelf.window.start, 4);
        assert!(!shelf.next_page());
        assert_eq!(shelf.visible().len(), 3);
        assert_eq!(shelf.selected().map(|game| game.id.as_str()), Some("6"));
    }

    #[test]
    fn replacing_the_game_keeps_gallery_position() {
        let with_images = |count: u32| {
            let mut game = game(4, "Gallery", 20.0);
            game.image_url = Some("https://cdn.test/cover.png".to_string());
            for index in 2..=count {
                game.extra.insert(
                    format!("ImageUrl{index}"),
                    json!(format!("https://cdn.test/{index}.png")),
                );
            }
            game
        };
        let mut detail = DetailState::new(with_images(3), 10, Screen::Store);
        detail.gallery.select(2);

        detail.replace_game(with_images(4));
        assert_eq!(detail.gallery.len(), 4);
        assert_eq!(detail.gallery.index(), 2);

        detail.replace_game(with_images(2));
        assert_eq!(detail.gallery.len(), 2);
        assert_eq!(detail.gallery.index(), 0);
        assert_eq!(
            detail.gallery.current(&detail.images),
            Some("https://cdn.test/cover.png")
        );
    }
}
