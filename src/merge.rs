use std::cmp::Ordering;
use std::collections::HashSet;

use crate::extract::SkipReason;
use crate::model::{IdGenerator, Shot, ShotDraft, Subject, SubjectDraft};

/// Leading integer of a scene value; anything unparseable is 0.
pub fn scene_key(scene: &str) -> i64 {
    let trimmed = scene.trim();
    let sign_len = usize::from(trimmed.starts_with(['-', '+']));
    let digits = trimmed[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| i + sign_len)
        .unwrap_or(trimmed.len());
    trimmed[..digits].parse().unwrap_or(0)
}

/// Shot number with every char but digits and dots removed, parsed as a float.
///
/// "2.1" sorts after "2" and before "3"; "12A" reads as 12; unparseable is 0.
pub fn shot_key(shot: &str) -> f64 {
    let kept: String = shot
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match kept.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => leading_float(&kept),
    }
}

// "1.2.3" does not parse whole; take the longest parseable prefix instead.
fn leading_float(s: &str) -> f64 {
    (1..=s.len())
        .rev()
        .find_map(|end| s[..end].parse::<f64>().ok())
        .unwrap_or(0.0)
}

pub fn compare_shots(a: &ShotDraft, b: &ShotDraft) -> Ordering {
    scene_key(&a.scene)
        .cmp(&scene_key(&b.scene))
        .then_with(|| shot_key(&a.shot).total_cmp(&shot_key(&b.shot)))
}

/// Sort in narrative order, keeping ties in their current order.
pub fn sort_shots(shots: &mut [Shot]) {
    shots.sort_by(|a, b| compare_shots(&a.draft, &b.draft));
}

/// Give every incoming draft a fresh id, append it, and re-sort.
///
/// Existing shots keep their ids. New ids never collide with one already in
/// `canonical`. Equal (scene, shot) keys keep concatenation order.
pub fn merge_shots<I>(canonical: &[Shot], incoming: I, ids: &IdGenerator) -> Vec<Shot>
where
    I: IntoIterator<Item = ShotDraft>,
{
    let mut taken: HashSet<String> = canonical.iter().map(|s| s.id.clone()).collect();
    let mut merged = canonical.to_vec();

    for draft in incoming {
        let id = ids.next_unused("shot", &taken);
        taken.insert(id.clone());
        merged.push(Shot { id, draft });
    }

    sort_shots(&mut merged);
    merged
}

/// Append proposed subjects whose names are not already taken.
///
/// Names compare case-insensitively against the canonical list and against
/// earlier proposals in the same batch. Collisions are dropped silently.
pub fn merge_subjects<I>(canonical: &[Subject], proposed: I, ids: &IdGenerator) -> Vec<Subject>
where
    I: IntoIterator<Item = SubjectDraft>,
{
    merge_subjects_with_report(canonical, proposed, ids).0
}

/// [`merge_subjects`] plus a [`SkipReason::DuplicateName`] per dropped proposal.
pub fn merge_subjects_with_report<I>(
    canonical: &[Subject],
    proposed: I,
    ids: &IdGenerator,
) -> (Vec<Subject>, Vec<SkipReason>)
where
    I: IntoIterator<Item = SubjectDraft>,
{
    let mut names: HashSet<String> = canonical.iter().map(|s| s.draft.name_key()).collect();
    let mut taken: HashSet<String> = canonical.iter().map(|s| s.id.clone()).collect();
    let mut merged = canonical.to_vec();
    let mut skipped = Vec::new();

    for draft in proposed {
        if !names.insert(draft.name_key()) {
            skipped.push(SkipReason::DuplicateName { name: draft.name });
            continue;
        }
        let id = ids.next_unused("subject", &taken);
        taken.insert(id.clone());
        merged.push(Subject { id, draft });
    }

    (merged, skipped)
}
