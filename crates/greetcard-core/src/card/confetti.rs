//! Randomized confetti and background decoration

use rand::Rng;
use serde::Serialize;

/// Pieces in a single confetti burst
pub const CONFETTI_PIECES: usize = 60;

/// Floating decorative elements behind the card
pub const DECORATIVE_ELEMENTS: usize = 15;

/// Confetti colour palette
pub const PALETTE: [&str; 6] = ["#FFC700", "#FF0080", "#00FFFF", "#7928CA", "#FF4D4D", "#00F2EA"];

/// A single falling confetti piece
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfettiPiece {
    /// Index within the burst
    pub id: usize,
    /// Horizontal start position, percent of width
    pub x: f32,
    /// Start delay in seconds
    pub delay: f32,
    /// Edge length in pixels
    pub size: f32,
    /// Fall duration in seconds
    pub duration: f32,
    /// Fill colour
    pub color: &'static str,
}

/// Confetti pieces for one celebration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfettiBurst {
    /// Pieces in render order
    pub pieces: Vec<ConfettiPiece>,
}

impl ConfettiBurst {
    /// Generate a standard burst of [`CONFETTI_PIECES`] pieces
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::with_count(rng, CONFETTI_PIECES)
    }

    /// Generate a burst with `count` pieces
    #[must_use]
    pub fn with_count<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Self {
        let pieces = (0..count)
            .map(|id| ConfettiPiece {
                id,
                x: rng.random_range(0.0..100.0),
                delay: rng.random_range(0.0..0.5),
                size: rng.random_range(5.0..15.0),
                duration: rng.random_range(1.5..2.5),
                color: PALETTE[rng.random_range(0..PALETTE.len())],
            })
            .collect();
        Self { pieces }
    }
}

/// Shape of a decorative element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// Filled circle
    Circle,
    /// Rotated square
    Square,
    /// Outline triangle
    Triangle,
    /// Five-point star
    Star,
}

impl Shape {
    const ALL: [Shape; 4] = [Shape::Circle, Shape::Square, Shape::Triangle, Shape::Star];
}

/// A slowly drifting background decoration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecorativeElement {
    /// Index within the set
    pub id: usize,
    /// Shape
    pub shape: Shape,
    /// Size in pixels
    pub size: f32,
    /// Horizontal position, percent
    pub x: f32,
    /// Vertical position, percent
    pub y: f32,
    /// Start delay in seconds
    pub delay: f32,
    /// Loop duration in seconds
    pub duration: f32,
}

impl DecorativeElement {
    /// Generate the standard set of [`DECORATIVE_ELEMENTS`] elements
    #[must_use]
    pub fn generate_set<R: Rng + ?Sized>(rng: &mut R) -> Vec<Self> {
        (0..DECORATIVE_ELEMENTS)
            .map(|id| Self {
                id,
                shape: Shape::ALL[rng.random_range(0..Shape::ALL.len())],
                size: rng.random_range(10.0..30.0),
                x: rng.random_range(0.0..100.0),
                y: rng.random_range(0.0..100.0),
                delay: rng.random_range(0.0..4.0),
                duration: rng.random_range(10.0..20.0),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn burst_has_sixty_pieces_with_sequential_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let burst = ConfettiBurst::generate(&mut rng);
        assert_eq!(burst.pieces.len(), 60);
        assert!(burst.pieces.iter().enumerate().all(|(i, p)| p.id == i));
    }

    #[test]
    fn same_seed_same_burst() {
        let a = ConfettiBurst::generate(&mut StdRng::seed_from_u64(42));
        let b = ConfettiBurst::generate(&mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn decorative_set_has_fifteen_elements() {
        let set = DecorativeElement::generate_set(&mut StdRng::seed_from_u64(1));
        assert_eq!(set.len(), 15);
    }

    proptest! {
        #[test]
        fn prop_confetti_stays_in_range(seed in any::<u64>()) {
            let burst = ConfettiBurst::generate(&mut StdRng::seed_from_u64(seed));
            for p in &burst.pieces {
                prop_assert!((0.0..=100.0).contains(&p.x));
                prop_assert!((0.0..=0.5).contains(&p.delay));
                prop_assert!((5.0..=15.0).contains(&p.size));
                prop_assert!((1.5..=2.5).contains(&p.duration));
                prop_assert!(PALETTE.contains(&p.color));
            }
        }

        #[test]
        fn prop_decorations_stay_in_range(seed in any::<u64>()) {
            for e in DecorativeElement::generate_set(&mut StdRng::seed_from_u64(seed)) {
                prop_assert!((10.0..=30.0).contains(&e.size));
                prop_assert!((0.0..=100.0).contains(&e.x));
                prop_assert!((0.0..=100.0).contains(&e.y));
                prop_assert!((0.0..=4.0).contains(&e.delay));
                prop_assert!((10.0..=20.0).contains(&e.duration));
            }
        }
    }
}
