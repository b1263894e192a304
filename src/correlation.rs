use serde::Serialize;
use uuid::Uuid;

use crate::stats::round_to;

/// A raw observation pair offered to [`analyze`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterInput {
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    pub points: Vec<ScatterPoint>,
    /// Pearson coefficient rounded to four decimals; zero when undefined.
    pub r: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    None,
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
    Flat,
}

impl Strength {
    pub fn as_str(self) -> &'static str {
        match self {
            Strength::None => "none",
            Strength::Weak => "weak",
            Strength::Moderate => "moderate",
            Strength::Strong => "strong",
        }
    }
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Positive => "positive",
            Direction::Negative => "negative",
            Direction::Flat => "flat",
        }
    }
}

/// Pairs are kept only when both coordinates are finite and non-negative.
fn is_valid(input: &ScatterInput) -> bool {
    input.x.is_finite() && input.y.is_finite() && input.x >= 0.0 && input.y >= 0.0
}

/// Drops invalid pairs and correlates the rest.
///
/// Zero valid pairs, or zero variance in either variable, yields `r = 0`.
pub fn analyze(pairs: &[ScatterInput]) -> CorrelationResult {
    let valid: Vec<&ScatterInput> = pairs.iter().filter(|pair| is_valid(pair)).collect();
    if valid.len() < pairs.len() {
        tracing::debug!(
            dropped = pairs.len() - valid.len(),
            "dropped invalid scatter pairs"
        );
    }

    let xs: Vec<f64> = valid.iter().map(|pair| pair.x).collect();
    let ys: Vec<f64> = valid.iter().map(|pair| pair.y).collect();
    let r = round_to(pearson(&xs, &ys), 4);

    let points = valid
        .into_iter()
        .map(|pair| ScatterPoint {
            x: round_to(pair.x, 2),
            y: round_to(pair.y, 2),
            label: pair.label.clone(),
            id: pair.id,
        })
        .collect();

    CorrelationResult { points, r }
}

/// Pearson correlation of two equally long samples, or 0 when it is undefined.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut sum_sq_x = 0.0;
    let mut sum_sq_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        sum_sq_x += dx * dx;
        sum_sq_y += dy * dy;
    }

    let denominator = sum_sq_x.sqrt() * sum_sq_y.sqrt();
    if sum_sq_x == 0.0 || sum_sq_y == 0.0 || denominator == 0.0 {
        return 0.0;
    }
    (covariance / denominator).clamp(-1.0, 1.0)
}

/// Describes a coefficient in words for report summaries.
pub fn interpret(r: f64) -> (Strength, Direction) {
    let magnitude = r.abs();
    let strength = if magnitude < 0.1 {
        Strength::None
    } else if magnitude < 0.3 {
        Strength::Weak
    } else if magnitude < 0.5 {
        Strength::Moderate
    } else {
        Strength::Strong
    };
    let direction = if strength == Strength::None {
        Direction::Flat
    } else if r > 0.0 {
        Direction::Positive
    } else {
        Direction::Negative
    };
    (strength, direction)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(x: f64, y: f64) -> ScatterInput {
        ScatterInput {
            x,
            y,
            label: format!("student {x}"),
            id: Uuid::new_v4(),
        }
    }

    #[test]
    fn perfect_linear_relation_is_one() {
        let pairs: Vec<_> = (1..=10).map(|x| input(f64::from(x), 2.0 * f64::from(x))).collect();
        let result = analyze(&pairs);
        assert_eq!(result.r, 1.0);
        assert_eq!(result.points.len(), 10);
    }

    #[test]
    fn inverse_relation_is_negative_one() {
        let pairs: Vec<_> = (1..=10).map(|x| input(f64::from(x), 20.0 - f64::from(x))).collect();
        assert_eq!(analyze(&pairs).r, -1.0);
    }

    #[test]
    fn constant_y_gives_zero() {
        let pairs: Vec<_> = (1..=10).map(|x| input(f64::from(x), 3.0)).collect();
        assert_eq!(analyze(&pairs).r, 0.0);
    }

    #[test]
    fn constant_x_gives_zero() {
        let pairs = vec![input(5.0, 1.0), input(5.0, 9.0), input(5.0, 4.0)];
        assert_eq!(analyze(&pairs).r, 0.0);
    }

    #[test]
    fn no_pairs_gives_empty_result() {
        let result = analyze(&[]);
        assert!(result.points.is_empty());
        assert_eq!(result.r, 0.0);
    }

    #[test]
    fn invalid_pairs_are_dropped() {
        let pairs = vec![
            input(1.0, 2.0),
            input(-1.0, 2.0),
            input(3.0, f64::NAN),
            input(f64::INFINITY, 1.0),
            input(2.0, 4.0),
        ];
        let result = analyze(&pairs);
        assert_eq!(result.points.len(), 2);
        assert_eq!(result.points[0].x, 1.0);
        assert_eq!(result.points[1].y, 4.0);
        assert_eq!(result.r, 1.0);
    }

    #[test]
    fn rounds_points_and_coefficient() {
        let pairs = vec![input(1.234, 5.678), input(2.0, 3.0), input(3.5, 9.999)];
        let result = analyze(&pairs);
        assert_eq!(result.points[0].x, 1.23);
        assert_eq!(result.points[0].y, 5.68);
        assert_eq!(result.points[2].y, 10.0);
        assert_eq!(result.r, round_to(result.r, 4));
    }

    #[test]
    fn labels_and_ids_are_carried_through() {
        let pair = input(70.0, 2.0);
        let result = analyze(std::slice::from_ref(&pair));
        assert_eq!(result.points[0].label, pair.label);
        assert_eq!(result.points[0].id, pair.id);
        assert_eq!(result.r, 0.0);
    }

    #[test]
    fn interpretation_buckets() {
        assert_eq!(interpret(0.05), (Strength::None, Direction::Flat));
        assert_eq!(interpret(0.2), (Strength::Weak, Direction::Positive));
        assert_eq!(interpret(-0.45), (Strength::Moderate, Direction::Negative));
        assert_eq!(interpret(-0.9), (Strength::Strong, Direction::Negative));
    }
}
