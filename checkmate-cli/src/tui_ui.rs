use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, TableState, Wrap,
    },
};

use crate::tui_app::{App, InputMode, TierFilter};
use checkmate_core::engine::{Severity, SortColumn, Tier};
use checkmate_core::hardware::is_running_in_wsl;

const DIM: Style = Style::new().fg(Color::DarkGray);
const TEXT: Style = Style::new().fg(Color::White);
const SEPARATOR: &str = "  │  ";

pub fn draw(frame: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // system info bar
            Constraint::Length(3), // search + filters
            Constraint::Min(10),   // main table
            Constraint::Length(1), // status bar
        ])
        .split(frame.area());

    draw_system_bar(frame, app, outer[0]);
    draw_search_and_filters(frame, app, outer[1]);

    if app.show_detail {
        draw_detail(frame, app, outer[2]);
    } else {
        draw_table(frame, app, outer[2]);
    }

    draw_status_bar(frame, app, outer[3]);
}

fn draw_system_bar(frame: &mut Frame, app: &App, area: Rect) {
    let gpu_info = match app.local.primary_gpu() {
        None => "GPU: none".to_string(),
        Some(primary) => {
            let primary_str = if primary.unified_memory {
                format!(
                    "{} ({:.1} GB unified)",
                    primary.name,
                    app.profile.shared_vram_gb()
                )
            } else if primary.count > 1 {
                format!(
                    "{} x{} ({:.0} GB total)",
                    primary.name,
                    primary.count,
                    app.profile.vram_gb()
                )
            } else {
                format!("{} ({:.1} GB)", primary.name, app.profile.vram_gb())
            };
            let extra = app.local.gpus.len() - 1;
            if extra > 0 {
                format!("GPU: {} +{} more", primary_str, extra)
            } else {
                format!("GPU: {}", primary_str)
            }
        }
    };

    let text = Line::from(vec![
        Span::styled(" CPU: ", DIM),
        Span::styled(
            format!("{} ({} cores)", app.profile.cpu_name(), app.local.cpu_cores),
            TEXT,
        ),
        Span::styled(SEPARATOR, DIM),
        Span::styled("RAM: ", DIM),
        Span::styled(
            format!(
                "{:.1} GB avail / {:.1} GB total{}",
                app.local.available_ram_gb,
                app.profile.ram_gb(),
                if is_running_in_wsl() { " (WSL)" } else { "" }
            ),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(SEPARATOR, DIM),
        Span::styled(gpu_info, Style::default().fg(Color::Yellow)),
        Span::styled(SEPARATOR, DIM),
        Span::styled(
            app.profile.vendor().label(),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(DIM)
        .title(" llm-checkmate ")
        .title_style(
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        );

    let paragraph = Paragraph::new(text).block(block);
    frame.render_widget(paragraph, area);
}

fn draw_search_and_filters(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(30),    // search
            Constraint::Length(18), // context
            Constraint::Length(18), // sort column
            Constraint::Length(20), // tier filter
        ])
        .split(area);

    // Search box
    let search_style = match app.input_mode {
        InputMode::Search => Style::default().fg(Color::Yellow),
        InputMode::Normal => DIM,
    };

    let search_text = if app.search_query.is_empty() && app.input_mode == InputMode::Normal {
        Line::from(Span::styled("Press / to search...", DIM))
    } else {
        Line::from(Span::styled(&app.search_query, TEXT))
    };

    let search_block = Block::default()
        .borders(Borders::ALL)
        .border_style(search_style)
        .title(" Search ")
        .title_style(search_style);

    let search = Paragraph::new(search_text).block(search_block);
    frame.render_widget(search, chunks[0]);

    if app.input_mode == InputMode::Search {
        frame.set_cursor_position((
            chunks[0].x + app.cursor_column() as u16 + 1,
            chunks[0].y + 1,
        ));
    }

    let small_block = |title: &'static str| {
        Block::default()
            .borders(Borders::ALL)
            .border_style(DIM)
            .title(title)
            .title_style(DIM)
    };

    let context_text = Paragraph::new(Line::from(Span::styled(
        format!(" {} tokens", app.context.tokens()),
        Style::default().fg(Color::Cyan),
    )))
    .block(small_block(" Context [c] "));
    frame.render_widget(context_text, chunks[1]);

    let sort_text = Paragraph::new(Line::from(Span::styled(
        format!(" {}", app.sort_column.label()),
        Style::default().fg(Color::Cyan),
    )))
    .block(small_block(" Sort [s] "));
    frame.render_widget(sort_text, chunks[2]);

    let filter_style = match app.tier_filter {
        TierFilter::All => TEXT,
        TierFilter::Local | TierFilter::Gpu => Style::default().fg(Color::Green),
        TierFilter::Offload => Style::default().fg(Color::Yellow),
        TierFilter::Experimental => Style::default().fg(Color::Magenta),
        TierFilter::Cloud => Style::default().fg(Color::Red),
    };
    let filter_text = Paragraph::new(Line::from(Span::styled(
        format!(" {}", app.tier_filter.label()),
        filter_style,
    )))
    .block(small_block(" Tier [f] "));
    frame.render_widget(filter_text, chunks[3]);
}

fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::NativePerformance => Color::Green,
        Tier::OptimizedLocal => Color::LightGreen,
        Tier::HybridOffload => Color::Yellow,
        Tier::CpuBottleneck => Color::LightYellow,
        Tier::Experimental => Color::Magenta,
        Tier::CloudOnly => Color::Red,
    }
}

fn severity_indicator(severity: Severity) -> &'static str {
    match severity {
        Severity::Ok => "●",
        Severity::Notice => "◐",
        Severity::Warning => "○",
        Severity::Critical => "✗",
    }
}

fn draw_table(frame: &mut Frame, app: &mut App, area: Rect) {
    let header_names = [
        "", "Model", "Params", "Tier", "GPU %", "tok/s", "Fine-tune", "Ctx", "Downloads",
    ];
    let sort_col_idx = match app.sort_column {
        SortColumn::Params => 2,
        SortColumn::Tier => 3,
        SortColumn::Speed => 5,
        SortColumn::Downloads => 8,
    };
    let header_cells = header_names.iter().enumerate().map(|(i, h)| {
        if i == sort_col_idx {
            Cell::from(format!("{} ▼", h)).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
        }
    });
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = app
        .filtered_results
        .iter()
        .map(|&idx| {
            let r = &app.all_results[idx];
            let color = tier_color(r.tier);

            let tps_text = match r.predicted_tps.value() {
                Some(v) if v >= 100.0 => format!("{:.0}", v),
                Some(v) => format!("{:.1}", v),
                None => "N/A".to_string(),
            };
            let ctx_color = if r.is_over_context_limit {
                Color::Red
            } else {
                Color::DarkGray
            };
            let fine_tune_color = if r.fine_tuning.is_feasible() {
                Color::Green
            } else {
                Color::DarkGray
            };

            Row::new(vec![
                Cell::from(severity_indicator(r.severity)).style(Style::default().fg(color)),
                Cell::from(r.model_id.clone()).style(TEXT),
                Cell::from(format!("{}B", r.params_b)).style(TEXT),
                Cell::from(r.tier.label()).style(Style::default().fg(color)),
                Cell::from(format!("{}%", r.gpu_offload_percent))
                    .style(TEXT),
                Cell::from(tps_text).style(TEXT),
                Cell::from(r.fine_tuning.label()).style(Style::default().fg(fine_tune_color)),
                Cell::from(format!("{}k", r.max_context / 1024))
                    .style(Style::default().fg(ctx_color)),
                Cell::from(if r.downloads > 0 {
                    r.downloads.to_string()
                } else {
                    "\u{2014}".to_string()
                })
                .style(DIM),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(2),  // indicator
        Constraint::Min(28),    // model id
        Constraint::Length(8),  // params
        Constraint::Length(20), // tier
        Constraint::Length(7),  // offload
        Constraint::Length(7),  // tok/s
        Constraint::Length(18), // fine-tune
        Constraint::Length(6),  // ctx
        Constraint::Length(11), // downloads
    ];

    let count_text = format!(
        " Models ({}/{}) ",
        app.filtered_results.len(),
        app.all_results.len()
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(DIM)
                .title(count_text)
                .title_style(TEXT),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(40, 40, 70))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    if !app.filtered_results.is_empty() {
        state.select(Some(app.selected_row));
    }

    frame.render_stateful_widget(table, area, &mut state);

    // Scrollbar
    if app.filtered_results.len() > (area.height as usize).saturating_sub(3) {
        let mut scrollbar_state =
            ScrollbarState::new(app.filtered_results.len()).position(app.selected_row);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓")),
            area,
            &mut scrollbar_state,
        );
    }
}

fn label_line<'a>(label: &'a str, value: String, color: Color) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("  {:<14}", label), DIM),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn draw_detail(frame: &mut Frame, app: &App, area: Rect) {
    let Some(r) = app.selected_result() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" No model selected ");
        frame.render_widget(block, area);
        return;
    };

    let color = tier_color(r.tier);

    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(format!("  {:<14}", "Model:"), DIM),
            Span::styled(&r.model_id, TEXT.bold()),
        ]),
        label_line("Parameters:", format!("{}B", r.params_b), Color::White),
        label_line(
            "Context:",
            format!(
                "{} requested / {} supported",
                r.context_window_tokens, r.max_context
            ),
            if r.is_over_context_limit {
                Color::Red
            } else {
                Color::White
            },
        ),
        Line::from(""),
        label_line(
            "Weights:",
            format!(
                "FP16 {:.2} GB  INT8 {:.2} GB  INT4 {:.2} GB",
                r.weight_size_gb.fp16, r.weight_size_gb.int8, r.weight_size_gb.int4
            ),
            Color::White,
        ),
        label_line(
            "KV cache:",
            format!("{:.2} GB", r.context_buffer_gb),
            Color::White,
        ),
        Line::from(""),
        label_line("Tier:", r.tier.label().to_string(), color),
        label_line("Severity:", r.severity.label().to_string(), color),
        label_line("GPU offload:", format!("{}%", r.gpu_offload_percent), Color::White),
        label_line("Speed:", r.predicted_tps.to_string(), Color::White),
        label_line("Fine-tuning:", r.fine_tuning.label().to_string(), Color::Cyan),
        Line::from(""),
        label_line("Strategy:", r.recommended_strategy.clone(), Color::Cyan),
        label_line("Command:", r.optimized_command.clone(), Color::Green),
        Line::from(""),
    ];

    lines.push(Line::from(Span::styled(
        "  Reasoning",
        DIM.add_modifier(Modifier::UNDERLINED),
    )));
    lines.push(Line::from(Span::styled(
        format!("  {}", r.reasoning),
        TEXT,
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(format!(" {} ", r.model_name))
        .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (keys, mode_text) = match app.input_mode {
        InputMode::Normal => {
            let detail_key = if app.show_detail {
                "Enter:table"
            } else {
                "Enter:detail"
            };
            (
                format!(
                    " ↑↓/jk:nav  {}  /:search  f:tier  s:sort  c:context  q:quit",
                    detail_key
                ),
                "NORMAL",
            )
        }
        InputMode::Search => (
            "  Type to search  Esc:done  Ctrl-U:clear".to_string(),
            "SEARCH",
        ),
    };

    let status_line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode_text),
            Style::default().fg(Color::Black).bg(Color::Green).bold(),
        ),
        Span::styled(keys, DIM),
    ]);

    frame.render_widget(Paragraph::new(status_line), area);
}
