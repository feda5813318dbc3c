//! Prediction history: cumulative chart, recent table, clear and export.

use super::{FRESH_COLOR, ROTTEN_COLOR, UiApp};
use eframe::egui;
use rfd::FileDialog;
use tomato_core::Quality;

const CHART_HEIGHT: f32 = 220.0;
const CHART_MARGIN: f32 = 28.0;
const FRESH_LINE: egui::Color32 = egui::Color32::from_rgb(0x22, 0xc5, 0x5e);
const ROTTEN_LINE: egui::Color32 = egui::Color32::from_rgb(0xef, 0x44, 0x44);

/// Label every `tick_step(n)`-th value so at most about ten ticks are drawn.
fn tick_step(count: usize) -> usize {
    count.div_ceil(10).max(1)
}

fn legend_entries() -> [(&'static str, egui::Color32); 2] {
    [
        (Quality::Fresh.short_name(), FRESH_LINE),
        (Quality::Rotten.short_name(), ROTTEN_LINE),
    ]
}

/// Maps a cumulative series onto `plot`. Index 0 sits on the left edge, the
/// last index on the right edge, `y_max` at the top.
fn series_points(series: &[usize], plot: egui::Rect, y_max: usize) -> Vec<egui::Pos2> {
    let y_max = y_max.max(1) as f32;
    let steps = series.len().saturating_sub(1).max(1) as f32;
    series
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let x = plot.left() + plot.width() * i as f32 / steps;
            let y = plot.bottom() - plot.height() * v as f32 / y_max;
            egui::pos2(x, y)
        })
        .collect()
}

impl UiApp {
    pub(super) fn render_history_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("Track your predictions and view the history of results.");
        ui.add_space(10.0);
        ui.heading("Prediction History");
        if self.session.ledger().is_empty() {
            ui.label("No predictions yet.");
        } else {
            self.paint_cumulative_chart(ui);
        }

        ui.add_space(12.0);
        ui.heading("Recent Predictions");
        if self.session.ledger().is_empty() {
            return;
        }
        self.render_recent_table(ui);

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("Clear History").clicked() {
                self.session.clear_history();
                self.status.clear();
            }
            if ui.button("Export CSV").clicked()
                && let Some(path) = FileDialog::new()
                    .add_filter("CSV", &["csv"])
                    .set_file_name("tomato_history.csv")
                    .save_file()
            {
                if let Err(e) = self.session.ledger().export_csv(&path) {
                    tracing::warn!("export to {} failed: {e}", path.display());
                    self.status = format!("Export failed: {e}");
                } else {
                    tracing::info!("exported history to {}", path.display());
                }
            }
        });
    }

    fn paint_cumulative_chart(&self, ui: &mut egui::Ui) {
        let (fresh, rotten) = self.session.ledger().cumulative_counts();
        let y_max = fresh
            .last()
            .copied()
            .unwrap_or(0)
            .max(rotten.last().copied().unwrap_or(0));

        let desired = egui::vec2(ui.available_width(), CHART_HEIGHT);
        let (resp, painter) = ui.allocate_painter(desired, egui::Sense::hover());
        let outer = resp.rect;
        let plot = egui::Rect::from_min_max(
            outer.min + egui::vec2(CHART_MARGIN, 8.0),
            outer.max - egui::vec2(8.0, CHART_MARGIN),
        );
        let text_color = ui.visuals().text_color();
        let grid = egui::Stroke::new(0.5, ui.visuals().weak_text_color());
        let font = egui::FontId::proportional(11.0);

        for v in (0..=y_max.max(1)).step_by(tick_step(y_max + 1)) {
            let y = plot.bottom() - plot.height() * v as f32 / y_max.max(1) as f32;
            painter.extend(egui::Shape::dashed_line(
                &[egui::pos2(plot.left(), y), egui::pos2(plot.right(), y)],
                grid,
                4.0,
                4.0,
            ));
            painter.text(
                egui::pos2(plot.left() - 6.0, y),
                egui::Align2::RIGHT_CENTER,
                v.to_string(),
                font.clone(),
                text_color,
            );
        }

        let x_step = tick_step(fresh.len());
        for (i, pos) in series_points(&fresh, plot, y_max)
            .iter()
            .enumerate()
            .step_by(x_step)
        {
            painter.text(
                egui::pos2(pos.x, plot.bottom() + 4.0),
                egui::Align2::CENTER_TOP,
                (i + 1).to_string(),
                font.clone(),
                text_color,
            );
        }
        painter.text(
            egui::pos2(plot.center().x, outer.bottom()),
            egui::Align2::CENTER_BOTTOM,
            "Predictions",
            font.clone(),
            text_color,
        );

        for (series, color) in [(&fresh, FRESH_LINE), (&rotten, ROTTEN_LINE)] {
            let points = series_points(series, plot, y_max);
            for p in &points {
                painter.circle_filled(*p, 3.0, color);
            }
            painter.add(egui::Shape::line(points, egui::Stroke::new(2.5, color)));
        }

        let legend = egui::pos2(plot.left() + 8.0, plot.top() + 4.0);
        for (row, (name, color)) in legend_entries().into_iter().enumerate() {
            let y = legend.y + row as f32 * 14.0 + 6.0;
            painter.line_segment(
                [egui::pos2(legend.x, y), egui::pos2(legend.x + 16.0, y)],
                egui::Stroke::new(2.5, color),
            );
            painter.text(
                egui::pos2(legend.x + 22.0, y),
                egui::Align2::LEFT_CENTER,
                name,
                font.clone(),
                text_color,
            );
        }
    }

    fn render_recent_table(&self, ui: &mut egui::Ui) {
        egui::Grid::new("recent-predictions")
            .num_columns(4)
            .striped(true)
            .spacing([24.0, 4.0])
            .show(ui, |ui| {
                for header in ["No.", "Time (UTC)", "Result", "Confidence (%)"] {
                    ui.strong(header);
                }
                ui.end_row();
                for (i, record) in self
                    .session
                    .ledger()
                    .recent(self.recent_limit)
                    .enumerate()
                {
                    ui.label((i + 1).to_string());
                    ui.label(record.display_time());
                    let text = egui::RichText::new(record.label.to_string());
                    match record.label {
                        Quality::Fresh => ui.label(text.color(FRESH_COLOR)),
                        Quality::Rotten => ui.label(text.color(ROTTEN_COLOR)),
                    };
                    ui.label(format!("{:.2}", record.confidence));
                    ui.end_row();
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn plot() -> egui::Rect {
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(100.0, 50.0))
    }

    #[test]
    fn series_spans_the_plot_width() {
        let pts = series_points(&[1, 2, 2], plot(), 2);
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[0].x, 0.0);
        assert_eq!(pts[1].x, 50.0);
        assert_eq!(pts[2].x, 100.0);
        assert_eq!(pts[0].y, 25.0);
        assert_eq!(pts[2].y, 0.0);
    }

    #[rstest]
    #[case(&[0], 0, 50.0)]
    #[case(&[1], 1, 0.0)]
    #[case(&[0, 0, 1], 1, 50.0)]
    fn first_point_height(#[case] series: &[usize], #[case] y_max: usize, #[case] y: f32) {
        let pts = series_points(series, plot(), y_max);
        assert_eq!(pts[0].x, 0.0);
        assert_eq!(pts[0].y, y);
    }

    #[test]
    fn empty_series_has_no_points() {
        assert!(series_points(&[], plot(), 0).is_empty());
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(10, 1)]
    #[case(11, 2)]
    #[case(40, 4)]
    #[case(1000, 100)]
    fn tick_step_keeps_about_ten_labels(#[case] count: usize, #[case] step: usize) {
        assert_eq!(tick_step(count), step);
        assert!((0..count).step_by(step).count() <= 10);
    }

    #[test]
    fn legend_names_match_quality_labels() {
        let names: Vec<_> = legend_entries().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["Fresh", "Rotten"]);
        assert_eq!(legend_entries()[0].1, FRESH_LINE);
    }
}
