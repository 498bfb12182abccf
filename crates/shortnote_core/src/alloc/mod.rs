//! Short identifier allocation.
//!
//! # Responsibility
//! - Draw uniformly random 6-character candidates from the note alphabet.
//! - Run the bounded generate -> check -> retry loop.
//!
//! # Invariants
//! - The loop never runs more than `max_attempts` existence checks.
//! - A failed existence check counts as a collision; allocation never
//!   returns an id whose check did not positively report "absent".
//! - A returned id was absent only at check time. Inserts must still reject
//!   primary-key conflicts.

use crate::model::note::{NoteId, NOTE_ID_ALPHABET, NOTE_ID_LEN};
use log::{debug, warn};
use rand::rngs::ThreadRng;
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Every candidate in `max_attempts` draws collided (or could not be checked).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationExhausted {
    /// Number of candidates that were drawn and checked.
    pub attempts: u32,
}

impl Display for AllocationExhausted {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not allocate a unique note id after {} attempt(s)",
            self.attempts
        )
    }
}

impl Error for AllocationExhausted {}

/// Random candidate source backed by any `rand` RNG.
#[derive(Debug, Clone)]
pub struct RandomIdGenerator<R: Rng> {
    rng: R,
}

impl RandomIdGenerator<ThreadRng> {
    /// Uses the thread-local CSPRNG.
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl Default for RandomIdGenerator<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RandomIdGenerator<R> {
    /// Uses a caller-supplied RNG, e.g. a seeded one in tests.
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draws one candidate.
    pub fn next_id(&mut self) -> NoteId {
        random_note_id(&mut self.rng)
    }
}

/// Draws 6 characters independently and uniformly from the alphabet.
pub fn random_note_id<R: Rng + ?Sized>(rng: &mut R) -> NoteId {
    let mut indices = [0usize; NOTE_ID_LEN];
    for slot in &mut indices {
        *slot = rng.gen_range(0..NOTE_ID_ALPHABET.len());
    }
    NoteId::from_alphabet_indices(indices)
}

/// Runs the bounded allocation loop.
///
/// `next_candidate` supplies candidates; `exists` reports whether a candidate
/// is taken. An `Err` from `exists` is logged and treated as taken.
///
/// # Errors
/// Returns [`AllocationExhausted`] after `max_attempts` unusable candidates.
/// `max_attempts == 0` fails immediately without drawing.
pub fn allocate<G, C, E>(
    mut next_candidate: G,
    mut exists: C,
    max_attempts: u32,
) -> Result<NoteId, AllocationExhausted>
where
    G: FnMut() -> NoteId,
    C: FnMut(&NoteId) -> Result<bool, E>,
    E: Display,
{
    for attempt in 1..=max_attempts {
        let candidate = next_candidate();
        match exists(&candidate) {
            Ok(false) => {
                debug!(
                    "event=id_allocate module=alloc status=ok note_id={} attempt={}",
                    candidate, attempt
                );
                return Ok(candidate);
            }
            Ok(true) => {
                debug!(
                    "event=id_allocate module=alloc status=collision note_id={} attempt={}",
                    candidate, attempt
                );
            }
            Err(err) => {
                warn!(
                    "event=id_allocate module=alloc status=check_failed note_id={} attempt={} error={}",
                    candidate, attempt, err
                );
            }
        }
    }

    warn!(
        "event=id_allocate module=alloc status=exhausted attempts={}",
        max_attempts
    );
    Err(AllocationExhausted {
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::{allocate, random_note_id, AllocationExhausted, RandomIdGenerator};
    use crate::model::note::{NoteId, NOTE_ID_ALPHABET, NOTE_ID_LEN};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::convert::Infallible;

    fn ids(values: &[&str]) -> impl FnMut() -> NoteId {
        let mut queue: Vec<NoteId> = values
            .iter()
            .rev()
            .map(|value| NoteId::parse(value).unwrap())
            .collect();
        move || queue.pop().expect("test ran out of candidates")
    }

    #[test]
    fn random_ids_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let id = random_note_id(&mut rng);
            assert_eq!(id.as_str().chars().count(), NOTE_ID_LEN);
            assert!(id.as_str().bytes().all(|b| NOTE_ID_ALPHABET.contains(&b)));
            assert!(NoteId::parse(id.as_str()).is_ok());
        }
    }

    #[test]
    fn random_ids_cover_digits_and_both_cases() {
        let mut generator = RandomIdGenerator::from_rng(StdRng::seed_from_u64(11));
        let mut seen = HashSet::new();
        for _ in 0..2_000 {
            seen.extend(generator.next_id().as_str().chars());
        }
        assert!(seen.iter().any(char::is_ascii_digit));
        assert!(seen.iter().any(char::is_ascii_lowercase));
        assert!(seen.iter().any(char::is_ascii_uppercase));
        assert_eq!(seen.len(), NOTE_ID_ALPHABET.len());
    }

    #[test]
    fn first_free_candidate_wins() {
        let taken: HashSet<&str> = ["aaaaaa", "bbbbbb"].into_iter().collect();
        let id = allocate(
            ids(&["aaaaaa", "bbbbbb", "A1b2C3"]),
            |candidate| Ok::<_, Infallible>(taken.contains(candidate.as_str())),
            10,
        )
        .unwrap();
        assert_eq!(id.as_str(), "A1b2C3");
    }

    #[test]
    fn always_colliding_store_exhausts_after_max_attempts() {
        let mut checks = 0u32;
        let mut rng = StdRng::seed_from_u64(3);
        let err = allocate(
            || random_note_id(&mut rng),
            |_| {
                checks += 1;
                Ok::<_, Infallible>(true)
            },
            10,
        )
        .unwrap_err();
        assert_eq!(err, AllocationExhausted { attempts: 10 });
        assert_eq!(checks, 10);
    }

    #[test]
    fn failed_checks_count_as_collisions() {
        let mut calls = 0;
        let id = allocate(
            ids(&["xxxxxx", "yyyyyy"]),
            |_| {
                calls += 1;
                if calls == 1 {
                    Err("connection reset")
                } else {
                    Ok(false)
                }
            },
            2,
        )
        .unwrap();
        assert_eq!(id.as_str(), "yyyyyy");

        let err = allocate(ids(&["zzzzzz"]), |_| Err::<bool, _>("timeout"), 1).unwrap_err();
        assert_eq!(err.attempts, 1);
    }

    #[test]
    fn zero_attempts_never_draws() {
        let err = allocate(
            || panic!("no candidate should be drawn"),
            |_| Ok::<_, Infallible>(false),
            0,
        )
        .unwrap_err();
        assert_eq!(err.attempts, 0);
    }
}
