use anyhow::Result;
use chrono::NaiveDate;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::chart::{self, ChartOptions};
use crate::data::Report;
use crate::types::StoreChart;

/// Data the page template needs besides the report itself
pub struct PageView<'a> {
    /// Local hour used for the greeting
    pub hour: u32,

    /// Store names for the dropdown, in display order
    pub stores: &'a [String],

    pub report: &'a Report,

    /// Shown above the charts when the last request could not be applied
    pub notice: Option<String>,
}

/// Part of the day used in the page greeting
pub fn time_of_day(hour: u32) -> &'static str {
    match hour {
        5..=11 => "Morning",
        12..=16 => "Afternoon",
        _ => "Evening",
    }
}

/// Write a static report page to disk
pub fn generate_html(view: &PageView<'_>, path: &Path) -> Result<()> {
    let html = render_page(view);
    fs::write(path, html.into_string())?;
    Ok(())
}

pub fn render_page(view: &PageView<'_>) -> Markup {
    let selection = &view.report.selection;
    let selected_store = selection.store.as_deref().unwrap_or("");
    let options = ChartOptions::default();

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { "Footfall Reports" }
                style { (PreEscaped(CSS)) }
            }
            body {
                div.container {
                    h1 { "Good " (time_of_day(view.hour)) ", Welcome." }
                    div.subtitle { "Store Footfall Camera Reports Dashboard." }

                    form.controls method="get" action="/" {
                        label for="store" { "Select Store:" }
                        select #store name="store" onchange="this.form.submit()" {
                            option value="" selected[selected_store.is_empty()] { "All stores" }
                            @for store in view.stores {
                                option value=(store) selected[store == selected_store] { (store) }
                            }
                        }
                        label for="start" { "Select Date Range:" }
                        input #start type="date" name="start" value=(iso(selection.window.start()));
                        input #end type="date" name="end" value=(iso(selection.window.end()));
                        button type="submit" { "Apply" }
                        button.reset type="submit" name="reset" value="1" { "Reset Date Range" }
                    }

                    @if let Some(notice) = &view.notice {
                        div.notice { (notice) }
                    }

                    div.stats {
                        (selection.window.len()) " days, "
                        (iso(selection.window.start())) " to " (iso(selection.window.end()))
                    }

                    @if view.report.charts.is_empty() {
                        div.empty-state {
                            p { "No stores found in the dataset." }
                        }
                    } @else {
                        @for store_chart in &view.report.charts {
                            (render_chart(store_chart, &options))
                        }
                    }
                }
            }
        }
    }
}

fn render_chart(store_chart: &StoreChart, options: &ChartOptions) -> Markup {
    let svg = match chart::render_svg(store_chart, options) {
        Ok(svg) => Some(svg),
        Err(e) => {
            warn!(store = %store_chart.store, error = %e, "Failed to draw chart");
            None
        }
    };

    html! {
        section.chart-card {
            h2 { "Foot Count for " (store_chart.store) }
            @if store_chart.is_empty() {
                p.no-data { "No data for this selection." }
            }
            @match svg {
                Some(svg) => div.chart { (PreEscaped(svg)) },
                None => p.no-data { "Chart could not be drawn." },
            }
        }
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

const CSS: &str = r#"
* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: Arial, sans-serif;
    background: #fff;
    color: rgb(50, 50, 50);
    line-height: 1.4;
}

.container {
    max-width: 980px;
    margin: 0 auto;
    padding: 40px 24px 60px;
}

h1 {
    text-align: center;
    font-size: 2.2em;
    margin-bottom: 8px;
}

.subtitle {
    text-align: center;
    margin-bottom: 24px;
}

.controls {
    display: flex;
    flex-wrap: wrap;
    gap: 10px;
    align-items: center;
    justify-content: center;
    margin-bottom: 20px;
}

.controls label {
    font-weight: 600;
}

.controls select {
    min-width: 240px;
}

.controls select,
.controls input,
.controls button {
    padding: 4px 8px;
    font-size: 0.95em;
}

.notice {
    background: #fff4e5;
    border: 1px solid #ffb35c;
    padding: 10px 14px;
    margin-bottom: 16px;
}

.stats {
    color: #888;
    font-size: 0.85em;
    text-align: center;
    margin-bottom: 24px;
}

.chart-card {
    margin-bottom: 40px;
}

.chart-card h2 {
    font-size: 1.15em;
    margin-bottom: 8px;
}

.no-data {
    color: #999;
    font-size: 0.9em;
}

.chart svg {
    max-width: 100%;
    height: auto;
}

.empty-state {
    padding: 60px 20px;
    text-align: center;
    color: #666;
}
"#;
