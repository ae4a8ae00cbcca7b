//! Dashboard App Module
//!
//! This module contains the main dashboard application logic: terminal
//! lifecycle, the event loop, and the key handling over the REST client.

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

use crate::client::{ApiClient, DatasetSummary, ModelSummary};

/// Dashboard tabs
pub const TAB_TITLES: [&str; 2] = ["Datasets", "Models"];

/// Represents the main dashboard application
pub struct DashboardApp {
    /// REST client
    client: ApiClient,
    /// Current tab index (0 = datasets, 1 = models)
    pub current_tab: usize,
    /// Dataset listing
    pub datasets: Vec<DatasetSummary>,
    /// Model listing
    pub models: Vec<ModelSummary>,
    /// Selected row in the current tab
    pub selected: usize,
    /// Last health probe result
    pub health: String,
    /// Status line for the footer
    pub status: String,
}

impl DashboardApp {
    /// Create a new dashboard application
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            current_tab: 0,
            datasets: Vec::new(),
            models: Vec::new(),
            selected: 0,
            health: "unknown".to_string(),
            status: "press r to refresh, q to quit".to_string(),
        }
    }

    /// Reload the listings and the health probe.
    pub async fn refresh(&mut self) {
        match self.client.health().await {
            Ok(body) => {
                self.health = body
                    .get("status")
                    .and_then(|s| s.as_str())
                    .unwrap_or("unknown")
                    .to_string();
            }
            Err(e) => self.health = format!("error: {}", e),
        }

        match self.client.list_datasets().await {
            Ok(datasets) => self.datasets = datasets,
            Err(e) => self.status = format!("Failed to list datasets: {}", e),
        }
        match self.client.list_models().await {
            Ok(models) => self.models = models,
            Err(e) => self.status = format!("Failed to list models: {}", e),
        }

        self.clamp_selection();
    }

    /// Number of rows in the current tab.
    pub fn row_count(&self) -> usize {
        match self.current_tab {
            0 => self.datasets.len(),
            _ => self.models.len(),
        }
    }

    fn clamp_selection(&mut self) {
        let rows = self.row_count();
        if rows == 0 {
            self.selected = 0;
        } else if self.selected >= rows {
            self.selected = rows - 1;
        }
    }

    /// Handle a key event. Returns false when the application should exit.
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
            KeyCode::Char('r') => {
                self.status = "refreshing...".to_string();
                self.refresh().await;
                self.status = "refreshed".to_string();
            }
            KeyCode::Tab | KeyCode::Right | KeyCode::Left => {
                self.current_tab = (self.current_tab + 1) % TAB_TITLES.len();
                self.selected = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.row_count() {
                    self.selected += 1;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Char('d') => self.delete_selected().await,
            _ => {}
        }
        Ok(true)
    }

    /// Delete the selected dataset or model.
    async fn delete_selected(&mut self) {
        if self.current_tab == 0 {
            let Some(dataset) = self.datasets.get(self.selected).cloned() else {
                return;
            };
            match self.client.delete_dataset(&dataset.id).await {
                Ok(_) => self.status = format!("deleted dataset {}", dataset.id),
                Err(e) => self.status = format!("delete failed: {}", e),
            }
        } else {
            let Some(model) = self.models.get(self.selected).cloned() else {
                return;
            };
            match self.client.delete_model(&model.model_id).await {
                Ok(_) => self.status = format!("deleted model {}", model.model_id),
                Err(e) => self.status = format!("delete failed: {}", e),
            }
        }
        self.refresh().await;
    }
}

/// Run the dashboard against a REST API base URL.
pub async fn run_dashboard(api_base: &str) -> Result<()> {
    info!("Starting dashboard against {}", api_base);

    let client = ApiClient::new(api_base, Duration::from_secs(10));
    let mut app = DashboardApp::new(client);
    app.refresh().await;

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let result = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut DashboardApp,
) -> Result<()> {
    loop {
        terminal.draw(|frame| crate::ui::render(frame, app))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key).await? {
                    return Ok(());
                }
            }
        }
    }
}
