// src/main.rs
use iced::alignment::Horizontal;
use iced::widget::canvas::Canvas;
use iced::widget::{
    button, checkbox, column, container, pick_list, row, scrollable, slider, text, Column, Row,
    Space,
};
use iced::{
    executor, subscription, theme, window, Application, Background, Color, Command, Element,
    Event, Length, Settings, Subscription, Theme,
};
use rfd::AsyncFileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info};

mod chart;
mod config;
mod csv_handler;
mod data_types;
mod error;
mod plot;
mod stats;
mod ui;

use chart::{ChartKind, ColorChoice, PickerOptions, Prepared, Selection};
use config::{APP_TITLE, BIN_RANGE, CELL_WIDTH, CHART_HEIGHT, INDEX_WIDTH, PREVIEW_ROWS, VERSION};
use csv_handler::CSVHandler;
use data_types::Dataset;
use error::LoadError;
use plot::ChartView;
use ui::Styles;

pub fn main() -> iced::Result {
    config::init_logging();
    info!(version = VERSION, "starting {}", APP_TITLE);

    Visualizer::run(Settings {
        window: window::Settings {
            size: config::WINDOW_SIZE,
            resizable: true,
            ..Default::default()
        },
        ..Settings::default()
    })
}

struct Visualizer {
    is_dark_mode: bool,
    file_path: Option<PathBuf>,
    loading: bool,
    // Bumped on every new upload so results of superseded loads are dropped.
    load_generation: u64,
    dataset: Option<Arc<Dataset>>,
    load_error: Option<LoadError>,
    selection: Selection,
    status: Option<String>,
}

#[derive(Debug, Clone)]
enum Message {
    ToggleTheme,
    OpenLocalFile,
    FileSelected(Option<PathBuf>),
    DataLoaded(u64, Result<Arc<Dataset>, LoadError>),
    ChartKindSelected(ChartKind),
    XSelected(String),
    YSelected(String),
    HistogramColumnSelected(String),
    ColorSelected(ColorChoice),
    BinsChanged(u32),
    ToggleStats(bool),
    ExportChart,
    ChartExported(Result<Option<PathBuf>, String>),
}

impl Application for Visualizer {
    type Executor = executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ();

    fn new(_flags: ()) -> (Self, Command<Message>) {
        (
            Visualizer {
                is_dark_mode: false,
                file_path: None,
                loading: false,
                load_generation: 0,
                dataset: None,
                load_error: None,
                selection: Selection::default(),
                status: None,
            },
            Command::none(),
        )
    }

    fn title(&self) -> String {
        match &self.file_path {
            Some(path) => format!("{} v{} - {}", APP_TITLE, VERSION, path.display()),
            None => format!("{} v{}", APP_TITLE, VERSION),
        }
    }

    fn theme(&self) -> Theme {
        if self.is_dark_mode {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::ToggleTheme => {
                self.is_dark_mode = !self.is_dark_mode;
                Command::none()
            }

            Message::OpenLocalFile => Command::perform(
                async {
                    AsyncFileDialog::new()
                        .add_filter("CSV Files", &["csv"])
                        .pick_file()
                        .await
                        .map(|handle| handle.path().to_path_buf())
                },
                Message::FileSelected,
            ),

            Message::FileSelected(path_opt) => {
                let Some(path) = path_opt else {
                    return Command::none();
                };
                info!(file = %path.display(), "loading file");

                self.file_path = Some(path.clone());
                self.dataset = None;
                self.load_error = None;
                self.status = None;
                self.loading = true;
                self.load_generation += 1;
                let generation = self.load_generation;

                Command::perform(
                    async move {
                        let csv_handler = CSVHandler::new();
                        csv_handler.read_csv(path).await
                    },
                    move |result| Message::DataLoaded(generation, result),
                )
            }

            Message::DataLoaded(generation, result) => {
                if generation != self.load_generation {
                    debug!(generation, "dropping result of a superseded load");
                    return Command::none();
                }
                self.loading = false;

                match result {
                    Ok(dataset) => {
                        self.selection
                            .reconcile(&PickerOptions::for_dataset(&dataset, self.selection.kind));
                        self.dataset = Some(dataset);
                        self.load_error = None;
                    }
                    Err(err) => {
                        self.dataset = None;
                        self.load_error = Some(err);
                    }
                }
                Command::none()
            }

            Message::ChartKindSelected(kind) => {
                debug!(%kind, "chart type selected");
                self.selection.kind = kind;
                self.reconcile();
                Command::none()
            }

            Message::XSelected(column) => {
                self.selection.x = Some(column);
                Command::none()
            }

            Message::YSelected(column) => {
                self.selection.y = Some(column);
                Command::none()
            }

            Message::HistogramColumnSelected(column) => {
                self.selection.histogram_column = Some(column);
                Command::none()
            }

            Message::ColorSelected(choice) => {
                self.selection.color = choice;
                Command::none()
            }

            Message::BinsChanged(bins) => {
                self.selection.bins = bins.clamp(*BIN_RANGE.start(), *BIN_RANGE.end());
                Command::none()
            }

            Message::ToggleStats(show) => {
                self.selection.show_stats = show;
                Command::none()
            }

            Message::ExportChart => {
                let Some(dataset) = &self.dataset else {
                    return Command::none();
                };
                let spec = match chart::prepare(dataset, &self.selection).chart {
                    Ok(spec) => spec,
                    Err(err) => {
                        self.status = Some(err.to_string());
                        return Command::none();
                    }
                };
                match serde_json::to_string_pretty(&spec) {
                    Ok(json) => Command::perform(save_json(json), Message::ChartExported),
                    Err(err) => {
                        error!(error = %err, "could not serialize chart");
                        self.status = Some(format!("Could not export chart: {err}"));
                        Command::none()
                    }
                }
            }

            Message::ChartExported(result) => {
                self.status = match result {
                    Ok(Some(path)) => {
                        info!(file = %path.display(), "exported chart");
                        Some(format!("Chart saved to {}", path.display()))
                    }
                    Ok(None) => None,
                    Err(err) => {
                        error!(error = %err, "could not write chart");
                        Some(format!("Could not export chart: {err}"))
                    }
                };
                Command::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        subscription::events_with(|event, _status| match event {
            Event::Window(window::Event::FileDropped(path)) => Some(Message::FileSelected(Some(path))),
            _ => None,
        })
    }

    fn view(&self) -> Element<Message> {
        let styles = ui::styles(self.is_dark_mode);

        let mut page = Column::new()
            .spacing(16)
            .padding(24)
            .width(Length::Fill)
            .push(text(APP_TITLE).size(36))
            .push(text("Upload your CSV file and create interactive visualizations").style(styles.muted_fg))
            .push(self.upload_row(styles));

        if let Some(err) = &self.load_error {
            page = page.push(text(format!("Error loading file: {err}")).style(styles.error_fg));
        }

        if let Some(dataset) = &self.dataset {
            page = page.push(self.dataset_view(dataset, styles));
        }

        let footer = row![
            text(format!("{} v{}", APP_TITLE, VERSION))
                .size(14)
                .style(styles.muted_fg),
            Space::with_width(Length::Fill),
            button(text(if self.is_dark_mode { "Light mode" } else { "Dark mode" }).size(14))
                .on_press(Message::ToggleTheme)
                .padding([4, 10]),
        ]
        .spacing(10)
        .padding(10)
        .width(Length::Fill);

        container(column![scrollable(page).height(Length::Fill), footer])
            .width(Length::Fill)
            .height(Length::Fill)
            .style(theme::Container::Custom(Box::new(ContainerStyle { bg: styles.bg })))
            .into()
    }
}

impl Visualizer {
    fn reconcile(&mut self) {
        if let Some(dataset) = &self.dataset {
            let options = PickerOptions::for_dataset(dataset, self.selection.kind);
            self.selection.reconcile(&options);
        }
    }

    fn upload_row(&self, styles: &'static Styles) -> Element<Message> {
        let file_label = if self.loading {
            "Loading ...".to_string()
        } else {
            self.file_path
                .as_ref()
                .and_then(|p| p.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "No file chosen. Pick a CSV file or drop one onto the window.".to_string())
        };

        row![
            button(text("Choose a CSV file"))
                .on_press(Message::OpenLocalFile)
                .padding([8, 14]),
            text(file_label).style(styles.muted_fg),
        ]
        .spacing(12)
        .align_items(iced::Alignment::Center)
        .into()
    }

    fn dataset_view(&self, dataset: &Dataset, styles: &'static Styles) -> Element<Message> {
        let rows = dataset.row_count();
        let cols = dataset.columns().len();

        let preview_rows: Vec<Vec<String>> = dataset
            .head(PREVIEW_ROWS)
            .into_iter()
            .enumerate()
            .map(|(i, cells)| std::iter::once(i.to_string()).chain(cells).collect())
            .collect();
        let preview_headers: Vec<String> =
            std::iter::once(String::new()).chain(dataset.column_names()).collect();

        let mut content = column![
            subheader("Raw Data Preview"),
            render_table(preview_headers, preview_rows, styles),
            subheader("Dataset Info"),
            row![
                text(format!("Number of rows: {rows}")).width(Length::FillPortion(1)),
                text(format!("Number of columns: {cols}")).width(Length::FillPortion(1)),
            ]
            .spacing(20),
            subheader("Create Visualization"),
        ]
        .spacing(12);

        let prepared = chart::prepare(dataset, &self.selection);
        content = content.push(chart_controls(&prepared));

        let chart_area: Element<Message> = match prepared.chart {
            Ok(spec) => Canvas::new(ChartView::new(spec, styles))
                .width(Length::Fill)
                .height(Length::Fixed(CHART_HEIGHT))
                .into(),
            Err(err) => container(text(err.to_string()).style(styles.muted_fg))
                .padding(20)
                .width(Length::Fill)
                .into(),
        };
        content = content.push(chart_area);

        let mut export = row![button(text("Export chart as JSON")).on_press(Message::ExportChart)]
            .spacing(12)
            .align_items(iced::Alignment::Center);
        if let Some(status) = &self.status {
            export = export.push(text(status).style(styles.muted_fg));
        }
        content = content.push(export);

        content = content.push(checkbox(
            "Show basic statistics",
            self.selection.show_stats,
            Message::ToggleStats,
        ));

        if self.selection.show_stats {
            let description = stats::describe(dataset);
            let headers: Vec<String> =
                std::iter::once(String::new()).chain(description.column_names()).collect();
            let rows: Vec<Vec<String>> = description
                .rows()
                .into_iter()
                .map(|(label, values)| std::iter::once(label.to_string()).chain(values).collect())
                .collect();
            content = content
                .push(subheader("Basic Statistics"))
                .push(render_table(headers, rows, styles));
        }

        content.into()
    }
}

fn subheader<'a>(label: &str) -> Element<'a, Message> {
    text(label).size(24).into()
}

fn labeled<'a>(label: impl ToString, control: impl Into<Element<'a, Message>>) -> Element<'a, Message> {
    column![text(label).size(14), control.into()].spacing(4).into()
}

fn chart_controls(prepared: &Prepared) -> Element<'static, Message> {
    let selection = &prepared.selection;
    let options = &prepared.options;

    let mut controls = Column::new().spacing(10).push(labeled(
        "Select Chart Type",
        pick_list(ChartKind::ALL.to_vec(), Some(selection.kind), Message::ChartKindSelected),
    ));

    let numeric_picker = |label: &str, choices: &[String], current: &Option<String>, on_pick: fn(String) -> Message| {
        labeled(
            label,
            pick_list(choices.to_vec(), current.clone(), on_pick).placeholder("No numeric columns"),
        )
    };

    match selection.kind {
        ChartKind::Line | ChartKind::Bar => {
            controls = controls
                .push(labeled(
                    "Select X-axis column",
                    pick_list(options.x.clone(), selection.x.clone(), Message::XSelected),
                ))
                .push(numeric_picker("Select Y-axis column", &options.y, &selection.y, Message::YSelected));
        }
        ChartKind::Histogram => {
            controls = controls
                .push(numeric_picker(
                    "Select column for histogram",
                    &options.histogram,
                    &selection.histogram_column,
                    Message::HistogramColumnSelected,
                ))
                .push(labeled(
                    format!("Number of bins: {}", selection.bins),
                    slider(BIN_RANGE, selection.bins, Message::BinsChanged),
                ));
        }
        ChartKind::Scatter => {
            controls = controls
                .push(numeric_picker("Select X-axis column", &options.x, &selection.x, Message::XSelected))
                .push(numeric_picker("Select Y-axis column", &options.y, &selection.y, Message::YSelected))
                .push(labeled(
                    "Select color column (optional)",
                    pick_list(options.color.clone(), Some(selection.color.clone()), Message::ColorSelected),
                ));
        }
    }

    container(controls).width(Length::Fixed(480.0)).into()
}

fn render_table(headers: Vec<String>, rows: Vec<Vec<String>>, styles: &'static Styles) -> Element<'static, Message> {
    let width = |i: usize| {
        if i == 0 {
            Length::Fixed(INDEX_WIDTH)
        } else {
            Length::Fixed(CELL_WIDTH)
        }
    };

    let header_row = Row::with_children(
        headers
            .into_iter()
            .enumerate()
            .map(|(i, header)| {
                container(text(header).size(15).style(styles.header_fg))
                    .width(width(i))
                    .padding(5)
                    .style(theme::Container::Custom(Box::new(ContainerStyle {
                        bg: styles.header_bg,
                    })))
                    .into()
            })
            .collect(),
    )
    .spacing(1);

    let body = rows.into_iter().map(|cells| {
        Row::with_children(
            cells
                .into_iter()
                .enumerate()
                .map(|(i, cell)| {
                    let cell = text(cell).size(15).style(styles.fg);
                    let cell = if i == 0 {
                        cell.horizontal_alignment(Horizontal::Right)
                    } else {
                        cell
                    };
                    container(cell)
                        .width(width(i))
                        .padding(5)
                        .style(theme::Container::Custom(Box::new(ContainerStyle {
                            bg: styles.cell_bg,
                        })))
                        .into()
                })
                .collect(),
        )
        .spacing(1)
        .into()
    });

    column![header_row]
        .push(Column::with_children(body.collect()).spacing(1))
        .spacing(1)
        .into()
}

async fn save_json(json: String) -> Result<Option<PathBuf>, String> {
    let Some(handle) = AsyncFileDialog::new()
        .add_filter("JSON", &["json"])
        .set_file_name("chart.json")
        .save_file()
        .await
    else {
        return Ok(None);
    };

    let path = handle.path().to_path_buf();
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| e.to_string())?;
    Ok(Some(path))
}

// Custom style for page and table containers
struct ContainerStyle {
    bg: Color,
}

impl container::StyleSheet for ContainerStyle {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            background: Some(Background::Color(self.bg)),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn app() -> Visualizer {
        Visualizer::new(()).0
    }

    fn dataset(text: &str) -> Arc<Dataset> {
        Arc::new(CSVHandler::parse_bytes(text.as_bytes()).expect("test csv parses"))
    }

    fn loaded(text: &str) -> Visualizer {
        let mut app = app();
        let _ = app.update(Message::FileSelected(Some(PathBuf::from("data.csv"))));
        let _ = app.update(Message::DataLoaded(app.load_generation, Ok(dataset(text))));
        app
    }

    #[test]
    fn starts_without_a_dataset() {
        let app = app();
        assert!(app.dataset.is_none());
        assert!(app.load_error.is_none());
        assert_eq!(app.selection, Selection::default());
    }

    #[test]
    fn successful_load_enters_dataset_state_with_reconciled_pickers() {
        let app = loaded("date,sales\n2024-01-01,3\n2024-01-02,4\n");
        assert!(!app.loading);
        assert!(app.dataset.is_some());
        assert_eq!(app.selection.x.as_deref(), Some("date"));
        assert_eq!(app.selection.y.as_deref(), Some("sales"));
    }

    #[test]
    fn failed_load_shows_error_and_no_dataset() {
        let mut app = loaded("a\n1\n");
        let _ = app.update(Message::FileSelected(Some(PathBuf::from("bad.csv"))));
        assert!(app.dataset.is_none());

        let err = LoadError::Malformed { line: 3, expected: 2, found: 1 };
        let _ = app.update(Message::DataLoaded(app.load_generation, Err(err.clone())));
        assert!(app.dataset.is_none());
        assert_eq!(app.load_error, Some(err));
    }

    #[test]
    fn superseded_loads_are_ignored() {
        let mut app = app();
        let _ = app.update(Message::FileSelected(Some(PathBuf::from("first.csv"))));
        let stale = app.load_generation;
        let _ = app.update(Message::FileSelected(Some(PathBuf::from("second.csv"))));

        let _ = app.update(Message::DataLoaded(stale, Ok(dataset("a\n1\n"))));
        assert!(app.dataset.is_none());
        assert!(app.loading);
    }

    #[test]
    fn cancelled_dialog_keeps_current_dataset() {
        let mut app = loaded("a\n1\n");
        let _ = app.update(Message::FileSelected(None));
        assert!(app.dataset.is_some());
    }

    #[test]
    fn switching_chart_type_repopulates_pickers() {
        let mut app = loaded("name,age,score\nann,31,1.5\nbob,42,2.5\n");
        let _ = app.update(Message::XSelected("name".into()));
        let _ = app.update(Message::ChartKindSelected(ChartKind::Scatter));

        assert_eq!(app.selection.x.as_deref(), Some("age"));
        let _ = app.update(Message::ChartKindSelected(ChartKind::Histogram));
        assert_eq!(app.selection.histogram_column.as_deref(), Some("age"));
    }

    #[test]
    fn bin_slider_is_clamped_and_stats_toggle() {
        let mut app = loaded("v\n1\n2\n");
        let _ = app.update(Message::BinsChanged(500));
        assert_eq!(app.selection.bins, 50);
        let _ = app.update(Message::BinsChanged(5));
        assert_eq!(app.selection.bins, 5);

        let _ = app.update(Message::ToggleStats(true));
        assert!(app.selection.show_stats);
    }

    #[test]
    fn exporting_without_numeric_columns_reports_guidance() {
        let mut app = loaded("name\nann\n");
        let _ = app.update(Message::ChartKindSelected(ChartKind::Histogram));
        let _ = app.update(Message::ExportChart);
        assert_eq!(
            app.status.as_deref(),
            Some("Histogram needs at least one numeric column; this dataset has none.")
        );
    }
}
