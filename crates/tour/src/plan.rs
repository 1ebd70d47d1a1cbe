use scene::{Experience, ExperienceId, NodeId, WalkGraph, ZoneId};

/// Authored tours rarely specify dwell; this is the house pacing.
pub const DEFAULT_DWELL_S: f64 = 12.0;
/// Steps never dwell shorter than this, whatever the author wrote.
pub const MIN_DWELL_MS: f64 = 3000.0;

/// One planned stop. Ephemeral: produced by planning, consumed in order.
#[derive(Debug, Clone, PartialEq)]
pub struct TourStep {
    pub experience_id: ExperienceId,
    pub node_id: NodeId,
    pub zone_id: Option<ZoneId>,
    pub zone_name: Option<String>,
    pub dwell_s: f64,
    pub narration: Option<String>,
}

impl TourStep {
    pub fn dwell_ms(&self) -> f64 {
        (self.dwell_s * 1000.0).max(MIN_DWELL_MS)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TourPlan {
    pub steps: Vec<TourStep>,
}

impl TourPlan {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&TourStep> {
        self.steps.get(index)
    }
}

/// Content provider for planning. The reachability probe lets planning skip
/// experiences whose assets are missing without pulling I/O into the
/// scheduler.
pub trait ExperienceSource {
    /// Available experiences, in presentation order.
    fn experiences(&mut self) -> Vec<Experience>;

    fn graph(&mut self, id: &str) -> Option<WalkGraph>;

    /// Whether the given panorama of the experience can be fetched.
    fn asset_reachable(&mut self, id: &str, file: &str) -> bool;
}

/// Builds the all-experiences itinerary: for each experience, its zones in
/// authored order (nodes in authored order within each), then unzoned
/// nodes. An experience whose graph is missing, empty, or whose first
/// panorama is unreachable is skipped entirely, not retried.
pub fn build_auto_plan(source: &mut dyn ExperienceSource) -> TourPlan {
    let mut steps = Vec::new();

    for experience in source.experiences() {
        let Some(graph) = source.graph(&experience.id) else {
            continue;
        };
        let Some(start) = graph.start_node() else {
            continue;
        };
        if !source.asset_reachable(&experience.id, &start.file) {
            continue;
        }

        for zone in &graph.zones {
            for node in graph.nodes_in_zone(&zone.id) {
                steps.push(TourStep {
                    experience_id: experience.id.clone(),
                    node_id: node.id.clone(),
                    zone_id: Some(zone.id.clone()),
                    zone_name: Some(zone.name.clone()),
                    dwell_s: DEFAULT_DWELL_S,
                    narration: None,
                });
            }
        }
        for node in graph.unzoned_nodes() {
            steps.push(TourStep {
                experience_id: experience.id.clone(),
                node_id: node.id.clone(),
                zone_id: None,
                zone_name: None,
                dwell_s: DEFAULT_DWELL_S,
                narration: None,
            });
        }
    }

    TourPlan { steps }
}

#[cfg(test)]
mod tests {
    use super::{build_auto_plan, ExperienceSource, TourStep, DEFAULT_DWELL_S, MIN_DWELL_MS};
    use pretty_assertions::assert_eq;
    use scene::{Experience, Node, WalkGraph, Zone};
    use std::collections::BTreeMap;

    pub(crate) struct FakeSource {
        pub experiences: Vec<Experience>,
        pub graphs: BTreeMap<String, WalkGraph>,
        pub unreachable: Vec<String>,
    }

    impl ExperienceSource for FakeSource {
        fn experiences(&mut self) -> Vec<Experience> {
            self.experiences.clone()
        }

        fn graph(&mut self, id: &str) -> Option<WalkGraph> {
            self.graphs.get(id).cloned()
        }

        fn asset_reachable(&mut self, id: &str, _file: &str) -> bool {
            !self.unreachable.iter().any(|u| u == id)
        }
    }

    fn node(id: &str, zone: Option<&str>) -> Node {
        Node {
            id: id.to_string(),
            file: format!("{id}.webp"),
            floor_id: "f1".to_string(),
            x: 0.0,
            y: 0.0,
            yaw_deg: 0.0,
            zone_id: zone.map(str::to_string),
            hotspots: Vec::new(),
        }
    }

    fn zoned_graph() -> WalkGraph {
        let mut g = WalkGraph::new();
        g.zones.push(Zone {
            id: "z1".to_string(),
            name: "Lobby".to_string(),
            floor_id: "f1".to_string(),
            rep_node_id: None,
            points: Vec::new(),
        });
        g.insert_node(node("a", Some("z1")));
        g.insert_node(node("b", None));
        g
    }

    #[test]
    fn plan_walks_zones_then_unzoned() {
        let mut source = FakeSource {
            experiences: vec![Experience::new("skywalk")],
            graphs: [("skywalk".to_string(), zoned_graph())].into(),
            unreachable: Vec::new(),
        };
        let plan = build_auto_plan(&mut source);
        let ids: Vec<_> = plan.steps.iter().map(|s| s.node_id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(plan.steps[0].zone_name.as_deref(), Some("Lobby"));
        assert_eq!(plan.steps[1].zone_id, None);
        assert_eq!(plan.steps[0].dwell_s, DEFAULT_DWELL_S);
    }

    #[test]
    fn unreachable_experience_is_skipped() {
        let mut source = FakeSource {
            experiences: vec![Experience::new("dead"), Experience::new("live")],
            graphs: [
                ("dead".to_string(), zoned_graph()),
                ("live".to_string(), zoned_graph()),
            ]
            .into(),
            unreachable: vec!["dead".to_string()],
        };
        let plan = build_auto_plan(&mut source);
        assert!(plan.steps.iter().all(|s| s.experience_id == "live"));
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn dwell_is_floored() {
        let step = TourStep {
            experience_id: "e".to_string(),
            node_id: "n".to_string(),
            zone_id: None,
            zone_name: None,
            dwell_s: 1.0,
            narration: None,
        };
        assert_eq!(step.dwell_ms(), MIN_DWELL_MS);
    }
}
