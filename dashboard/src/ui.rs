//! Dashboard UI Module
//!
//! Rendering for the dashboard: a tab bar, the dataset/model table of the
//! active tab, and a footer with the health probe and key help.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Paragraph, Row, Table, TableState, Tabs},
    Frame,
};

use crate::app::{DashboardApp, TAB_TITLES};

/// Render the whole dashboard frame.
pub fn render(frame: &mut Frame, app: &DashboardApp) {
    let [tabs_area, table_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    render_tabs(frame, app, tabs_area);
    match app.current_tab {
        0 => render_datasets(frame, app, table_area),
        _ => render_models(frame, app, table_area),
    }
    render_footer(frame, app, footer_area);
}

fn render_tabs(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let tabs = Tabs::new(TAB_TITLES.to_vec())
        .select(app.current_tab)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .block(Block::bordered().title("Modelyard Dashboard"));
    frame.render_widget(tabs, area);
}

fn render_datasets(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let rows: Vec<Row> = app
        .datasets
        .iter()
        .map(|d| {
            Row::new(vec![
                d.id.clone(),
                d.original_filename.clone().unwrap_or_else(|| d.filename.clone()),
                format!("{}", d.size_bytes),
                format!("{}", d.created_at),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(34),
            Constraint::Min(16),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["id", "file", "bytes", "created"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .highlight_style(Style::default().bg(Color::DarkGray))
    .block(Block::bordered().title(format!("Datasets ({})", app.datasets.len())));

    let mut state = TableState::default();
    state.select(Some(app.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_models(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let rows: Vec<Row> = app
        .models
        .iter()
        .map(|m| {
            let accuracy = m
                .metrics
                .as_ref()
                .and_then(|metrics| metrics.get("accuracy"))
                .map(|a| format!("{:.3}", a))
                .unwrap_or_else(|| "-".to_string());
            Row::new(vec![
                m.model_id.clone(),
                m.model_key.clone(),
                m.dataset_id.clone(),
                m.target_column.clone(),
                accuracy,
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(34),
            Constraint::Length(20),
            Constraint::Length(34),
            Constraint::Min(8),
            Constraint::Length(9),
        ],
    )
    .header(
        Row::new(vec!["id", "key", "dataset", "target", "accuracy"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .highlight_style(Style::default().bg(Color::DarkGray))
    .block(Block::bordered().title(format!("Models ({})", app.models.len())));

    let mut state = TableState::default();
    state.select(Some(app.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_footer(frame: &mut Frame, app: &DashboardApp, area: Rect) {
    let footer = Paragraph::new(Line::from(format!(
        "health: {} | {} | r refresh  tab switch  d delete  q quit",
        app.health, app.status
    )))
    .block(Block::bordered());
    frame.render_widget(footer, area);
}
