//! Stateless waveform functions over a phase angle in radians.
//!
//! Any finite phase is accepted; the engine always passes phases already
//! reduced into `[0, 2π)`.

use core::f32::consts::TAU;

pub fn sine(phase: f32) -> f32 {
    libm::sinf(phase)
}

/// Triangle aligned with [`sine`]: 0 at phase 0, peaks of ±1 at π/2 and 3π/2.
pub fn triangle(phase: f32) -> f32 {
    let t = wrap_phase(phase) / TAU;
    if t < 0.25 {
        4.0 * t
    } else if t < 0.75 {
        2.0 - 4.0 * t
    } else {
        4.0 * t - 4.0
    }
}

/// Sign of the sine at `phase`; zero crossings count as positive.
pub fn square(phase: f32) -> f32 {
    if sine(phase) < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Reduce any finite phase into `[0, 2π)`.
pub fn wrap_phase(phase: f32) -> f32 {
    let mut p = libm::fmodf(phase, TAU);
    if p < 0.0 {
        p += TAU;
    }
    // Adding TAU to a tiny negative remainder can round up to TAU itself.
    if p >= TAU {
        0.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::{FRAC_PI_2, PI};

    const EPS: f32 = 1e-5;

    #[test]
    fn sine_landmarks() {
        assert!(sine(0.0).abs() < EPS);
        assert!((sine(FRAC_PI_2) - 1.0).abs() < EPS);
        assert!((sine(3.0 * FRAC_PI_2) + 1.0).abs() < EPS);
    }

    #[test]
    fn triangle_landmarks() {
        assert!(triangle(0.0).abs() < EPS);
        assert!((triangle(FRAC_PI_2) - 1.0).abs() < EPS);
        assert!(triangle(PI).abs() < EPS);
        assert!((triangle(3.0 * FRAC_PI_2) + 1.0).abs() < EPS);
    }

    #[test]
    fn triangle_accepts_unreduced_phase() {
        assert!((triangle(FRAC_PI_2 + TAU) - triangle(FRAC_PI_2)).abs() < 1e-4);
        assert!((triangle(FRAC_PI_2 - TAU) - triangle(FRAC_PI_2)).abs() < 1e-4);
    }

    #[test]
    fn square_follows_sign_of_sine() {
        assert_eq!(square(0.0), 1.0);
        assert_eq!(square(1.0), 1.0);
        assert_eq!(square(PI + 0.1), -1.0);
        assert_eq!(square(TAU - 0.1), -1.0);
    }

    #[test]
    fn waveforms_stay_in_range() {
        for i in 0..10_000 {
            let phase = i as f32 * 0.0137 - 50.0;
            for value in [sine(phase), triangle(phase), square(phase)] {
                assert!((-1.0..=1.0).contains(&value), "{value} at {phase}");
            }
        }
    }

    #[test]
    fn wrap_phase_stays_in_range() {
        for phase in [-1e-9, -TAU, -0.5, 0.0, TAU, TAU * 3.5, 1e6, -1e6] {
            let p = wrap_phase(phase);
            assert!((0.0..TAU).contains(&p), "{phase} wrapped to {p}");
        }
    }
}
