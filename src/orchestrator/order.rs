use rand::seq::SliceRandom;
use rand::Rng;

use super::DiscussionMode;
use crate::personas::Personality;

/// Compute the order in which participants give their primary response.
///
/// Confrontational modes sort by interruptiveness score, highest first. The
/// sort is stable, so equal scores keep their input order. Every other mode
/// gets a fresh uniform shuffle from `rng`.
pub fn response_order<'a, R: Rng + ?Sized>(
    participants: &'a [Personality],
    mode: DiscussionMode,
    rng: &mut R,
) -> Vec<&'a Personality> {
    let mut order: Vec<&Personality> = participants.iter().collect();
    if mode.is_confrontational() {
        order.sort_by(|a, b| {
            b.interruptiveness
                .score()
                .cmp(&a.interruptiveness.score())
        });
    } else {
        order.shuffle(rng);
    }
    order
}
