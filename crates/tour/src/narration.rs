//! Auto-generated narration: pure string composition, no external service.

use std::collections::BTreeMap;

use scene::{Experience, ExperienceId};

use crate::plan::{TourPlan, TourStep};

/// Narration for one step given its predecessor: names the experience,
/// announces entering vs. staying within a zone, then the move itself.
pub fn narration_for_step(
    experience_label: &str,
    step: &TourStep,
    prev: Option<&TourStep>,
) -> String {
    let mut text = format!("You are in the {experience_label} experience.");

    match &step.zone_name {
        Some(zone) => {
            let same_zone = prev
                .filter(|p| p.experience_id == step.experience_id)
                .map(|p| p.zone_id == step.zone_id)
                .unwrap_or(false);
            if same_zone {
                text.push_str(&format!(" Staying in the {zone} area."));
            } else {
                text.push_str(&format!(" Entering the {zone} area."));
            }
        }
        None => text.push_str(" Exploring the current area."),
    }

    let moved = prev.map(|p| p.node_id != step.node_id).unwrap_or(true);
    if moved {
        text.push_str(" Moving to the next viewpoint; take a moment to look around.");
    } else {
        text.push_str(" Take a moment to look around.");
    }
    text
}

/// Fills in narration for every step that lacks an authored one.
pub fn fill_narration(plan: &mut TourPlan, experiences: &[Experience]) {
    let labels: BTreeMap<ExperienceId, String> = experiences
        .iter()
        .map(|e| (e.id.clone(), e.display_label()))
        .collect();

    for i in 0..plan.steps.len() {
        if plan.steps[i].narration.is_some() {
            continue;
        }
        let label = labels
            .get(&plan.steps[i].experience_id)
            .cloned()
            .unwrap_or_else(|| {
                Experience::new(plan.steps[i].experience_id.clone()).display_label()
            });
        let prev = if i > 0 { Some(plan.steps[i - 1].clone()) } else { None };
        plan.steps[i].narration =
            Some(narration_for_step(&label, &plan.steps[i], prev.as_ref()));
    }
}

#[cfg(test)]
mod tests {
    use super::{fill_narration, narration_for_step};
    use crate::plan::{TourPlan, TourStep};
    use pretty_assertions::assert_eq;
    use scene::Experience;

    fn step(node: &str, zone: Option<&str>) -> TourStep {
        TourStep {
            experience_id: "sky-lobby".to_string(),
            node_id: node.to_string(),
            zone_id: zone.map(str::to_string),
            zone_name: zone.map(str::to_string),
            dwell_s: 12.0,
            narration: None,
        }
    }

    #[test]
    fn first_step_enters_its_zone() {
        let text = narration_for_step("Sky Lobby", &step("a", Some("Atrium")), None);
        assert_eq!(
            text,
            "You are in the Sky Lobby experience. Entering the Atrium area. \
             Moving to the next viewpoint; take a moment to look around."
        );
    }

    #[test]
    fn same_zone_move_says_staying() {
        let prev = step("a", Some("Atrium"));
        let text = narration_for_step("Sky Lobby", &step("b", Some("Atrium")), Some(&prev));
        assert!(text.contains("Staying in the Atrium area."), "{text}");
    }

    #[test]
    fn unzoned_step_explores() {
        let text = narration_for_step("Sky Lobby", &step("a", None), None);
        assert!(text.contains("Exploring the current area."), "{text}");
    }

    #[test]
    fn fill_respects_authored_narration() {
        let mut plan = TourPlan {
            steps: vec![
                TourStep {
                    narration: Some("Welcome!".to_string()),
                    ..step("a", None)
                },
                step("b", None),
            ],
        };
        fill_narration(&mut plan, &[Experience::new("sky-lobby")]);
        assert_eq!(plan.steps[0].narration.as_deref(), Some("Welcome!"));
        // Derived label from the experience id.
        assert!(plan.steps[1]
            .narration
            .as_deref()
            .unwrap()
            .starts_with("You are in the Sky Lobby experience."));
    }
}
