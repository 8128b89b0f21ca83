//! Per-frame round update
//!
//! The host calls `tick` once per frame with the current time in ms. Input
//! is applied first, then the ring advances, then the acquisition clock.

use glam::Vec2;

use super::state::{EmissionRecord, RoundPhase, RoundSession};

/// Zone intensity above which demo mode marks a cell
pub const DEMO_GUESS_THRESHOLD: f32 = 0.8;

/// Input commands for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Fire the next emission now (space)
    pub fire: bool,
    /// Click position in world coordinates
    pub click: Option<Vec2>,
    /// Clear every guess (correction only)
    pub clear_guesses: bool,
    /// Fill and score the guesses (correction only)
    pub finalize: bool,
    /// Idle/demo mode - marks TOF peaks and finalizes on its own
    pub idle_mode: bool,
}

/// Advance the round to time `now`
pub fn tick(session: &mut RoundSession, input: &TickInput, now: u64) {
    match session.phase {
        RoundPhase::Acquiring => {
            if let Some(point) = input.click {
                session.handle_click(point);
            }
        }
        RoundPhase::Correction => {
            if input.clear_guesses {
                session.clear_guesses();
            }
            if let Some(point) = input.click {
                session.handle_click(point);
            }
            if input.finalize {
                session.finalize();
            }
        }
        RoundPhase::Results => {}
    }

    // Pending blinks and fade-out run in every phase
    session.ring.update(now);

    if session.phase == RoundPhase::Acquiring {
        let due = now.saturating_sub(session.last_emission_time) >= session.config.emission_interval_ms;
        if input.fire || due {
            if let Some(record) = session.fire_emission(now) {
                if input.idle_mode {
                    demo_guess(session, &record);
                }
            }
        }

        if session.remaining_emissions() == 0 {
            let shown = now.saturating_sub(session.lor_display_time) >= session.config.lor_display_ms;
            if session.emissions_fired == 0 || shown {
                session.set_phase(RoundPhase::Correction);
            }
        }
    }

    if input.idle_mode && session.phase == RoundPhase::Correction {
        session.finalize();
    }
}

/// Naive reconstruction: mark where the TOF zone says the source most likely was
fn demo_guess(session: &mut RoundSession, record: &EmissionRecord) {
    let Some(zone) = session.probability_zone_for(record) else {
        return;
    };
    if let Some(((row, col), _)) = zone.peak() {
        session.guesses.add(row, col);
    }
    for ((row, col), intensity) in zone.iter() {
        if intensity >= DEMO_GUESS_THRESHOLD {
            session.guesses.add(row, col);
        }
    }
}
