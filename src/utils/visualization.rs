//! Plotting of closed-loop tracking runs with gnuplot

use gnuplot::{AutoOption, AxesCommon, Caption, Color, Figure, LineWidth, PointSize, PointSymbol};

/// Color palette for consistent styling
pub mod colors {
    pub const BLACK: &str = "#000000";
    pub const RED: &str = "#FF0000";
    pub const GREEN: &str = "#00AA00";
    pub const BLUE: &str = "#0000FF";

    pub const REFERENCE: &str = BLACK;
    pub const DRIVEN: &str = BLUE;
    pub const PREDICTED: &str = GREEN;
    pub const FAILURE: &str = RED;
}

/// Style for path rendering
#[derive(Debug, Clone)]
pub struct PathStyle {
    pub color: String,
    pub line_width: f64,
    pub caption: String,
}

impl PathStyle {
    pub fn new(color: &str, caption: &str) -> Self {
        Self { color: color.to_string(), line_width: 2.0, caption: caption.to_string() }
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }
}

/// Reference track, driven path and sampled MPC predictions of one run
#[derive(Debug, Clone, Default)]
pub struct TrackingPlot {
    title: String,
    reference: (Vec<f64>, Vec<f64>),
    driven: (Vec<f64>, Vec<f64>),
    /// predicted horizons, world frame
    predictions: Vec<(Vec<f64>, Vec<f64>)>,
    failures: (Vec<f64>, Vec<f64>),
}

impl TrackingPlot {
    pub fn new(title: &str) -> Self {
        Self { title: title.to_string(), ..Default::default() }
    }

    pub fn set_reference(&mut self, xs: &[f64], ys: &[f64]) -> &mut Self {
        self.reference = (xs.to_vec(), ys.to_vec());
        self
    }

    pub fn push_position(&mut self, x: f64, y: f64) -> &mut Self {
        self.driven.0.push(x);
        self.driven.1.push(y);
        self
    }

    /// Predicted horizon in the vehicle frame of a pose `(px, py, psi)`
    pub fn push_prediction(&mut self, px: f64, py: f64, psi: f64, xs: &[f64], ys: &[f64]) -> &mut Self {
        let (sin, cos) = psi.sin_cos();
        let (wx, wy) = xs
            .iter()
            .zip(ys.iter())
            .map(|(&x, &y)| (px + x * cos - y * sin, py + x * sin + y * cos))
            .unzip();
        self.predictions.push((wx, wy));
        self
    }

    /// Position where the controller had no solution
    pub fn push_failure(&mut self, x: f64, y: f64) -> &mut Self {
        self.failures.0.push(x);
        self.failures.1.push(y);
        self
    }

    pub fn num_predictions(&self) -> usize {
        self.predictions.len()
    }

    fn figure(&self) -> Figure {
        let mut fg = Figure::new();
        let axes = fg.axes2d();
        axes.set_title(&self.title, &[]);
        axes.set_x_label("X [m]", &[]);
        axes.set_y_label("Y [m]", &[]);
        axes.set_aspect_ratio(AutoOption::Auto);

        let reference = PathStyle::new(colors::REFERENCE, "Reference").with_line_width(1.0);
        axes.lines(
            &self.reference.0,
            &self.reference.1,
            &[Caption(&reference.caption), Color(&reference.color), LineWidth(reference.line_width)],
        );

        let predicted = PathStyle::new(colors::PREDICTED, "MPC prediction").with_line_width(1.0);
        for (i, (xs, ys)) in self.predictions.iter().enumerate() {
            let caption = if i == 0 { predicted.caption.as_str() } else { "" };
            axes.lines(xs, ys, &[Caption(caption), Color(&predicted.color), LineWidth(predicted.line_width)]);
        }

        let driven = PathStyle::new(colors::DRIVEN, "Driven");
        axes.lines(
            &self.driven.0,
            &self.driven.1,
            &[Caption(&driven.caption), Color(&driven.color), LineWidth(driven.line_width)],
        );

        if !self.failures.0.is_empty() {
            axes.points(
                &self.failures.0,
                &self.failures.1,
                &[Caption("No solution"), Color(colors::FAILURE), PointSymbol('x'), PointSize(1.0)],
            );
        }
        fg
    }

    /// Save to an SVG file
    pub fn save_svg(&self, path: &str) -> Result<(), String> {
        let mut fg = self.figure();
        fg.save_to_svg(path, 800, 600).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_rotated_into_world() {
        let mut plot = TrackingPlot::new("test");
        plot.push_prediction(1.0, 2.0, std::f64::consts::FRAC_PI_2, &[0.0, 1.0], &[0.0, 0.0]);
        let (xs, ys) = &plot.predictions[0];
        assert!((xs[1] - 1.0).abs() < 1e-12);
        assert!((ys[1] - 3.0).abs() < 1e-12);
        assert_eq!(plot.num_predictions(), 1);
    }

    #[test]
    fn test_path_style() {
        let style = PathStyle::new(colors::RED, "Test Path").with_line_width(3.0);
        assert_eq!(style.line_width, 3.0);
        assert_eq!(style.color, colors::RED);
    }
}
