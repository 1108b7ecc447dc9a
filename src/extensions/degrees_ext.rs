/// A trait to wrap angles expressed in degrees onto the compass circle.
pub trait NormalizeDegrees {
    /// Returns `self` wrapped into the half-open range `[0, 360)`.
    fn normalize_degrees(self) -> Self;
}

macro_rules! impl_normalize_degrees {
    ($($t:ty)*) => ($(
        impl NormalizeDegrees for $t {
            fn normalize_degrees(self) -> $t {
                // Adding zero folds -0.0 into 0.0
                let wrapped = self.rem_euclid(360.0) + 0.0;
                // rem_euclid rounds tiny negative inputs up to exactly 360
                if wrapped >= 360.0 { 0.0 } else { wrapped }
            }
        }
    )*)
}

impl_normalize_degrees! { f32 f64 }

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(-0.0, 0.0)]
    #[case(90.0, 90.0)]
    #[case(360.0, 0.0)]
    #[case(450.0, 90.0)]
    #[case(-90.0, 270.0)]
    #[case(-720.0, 0.0)]
    #[case(-1e-20, 0.0)]
    #[case(1080.5, 0.5)]
    fn normalize_degrees_f64(#[case] input: f64, #[case] expected: f64) {
        assert_eq!(input.normalize_degrees(), expected);
        assert!(input.normalize_degrees().is_sign_positive());
    }

    #[rstest]
    #[case(-45.0, 315.0)]
    #[case(725.0, 5.0)]
    fn normalize_degrees_f32(#[case] input: f32, #[case] expected: f32) {
        assert_eq!(input.normalize_degrees(), expected);
    }
}
