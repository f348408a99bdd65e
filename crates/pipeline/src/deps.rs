//! Composite-decoder dependency ordering
//!
//! A `MultiDecoder` section composes sibling decoders named in its `subs`
//! list, and those subs may themselves be MultiDecoders. Before any of them
//! is prepped, the loader orders them so every composite comes after all of
//! its subs.

use std::collections::HashSet;

use crate::error::PipelineError;

/// One MultiDecoder and the decoder names it composes
#[derive(Debug, Clone)]
pub(crate) struct MultiDecoderNode {
    pub name: String,
    pub subs: Vec<String>,
}

impl MultiDecoderNode {
    pub fn new(name: impl Into<String>, subs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            subs,
        }
    }
}

/// Topologically order MultiDecoder nodes after their subs
///
/// `known_decoders` holds the names of every plain decoder instance; a sub
/// naming neither a plain decoder nor another node is an
/// [`PipelineError::UnknownSubDecoder`]. A dependency cycle among the nodes
/// is a [`PipelineError::CyclicDependency`]. The returned order is stable:
/// ties break by the nodes' original order.
pub(crate) fn order_multi_decoders(
    nodes: Vec<MultiDecoderNode>,
    known_decoders: &HashSet<String>,
) -> Result<Vec<MultiDecoderNode>, PipelineError> {
    let node_names: HashSet<String> = nodes.iter().map(|n| n.name.clone()).collect();

    for node in &nodes {
        for sub in &node.subs {
            if !known_decoders.contains(sub) && !node_names.contains(sub) {
                return Err(PipelineError::UnknownSubDecoder {
                    decoder: node.name.clone(),
                    sub: sub.clone(),
                });
            }
        }
    }

    let mut ordered = Vec::with_capacity(nodes.len());
    let mut emitted: HashSet<String> = HashSet::new();
    let mut remaining = nodes;

    while !remaining.is_empty() {
        let mut stalled = true;
        let mut deferred = Vec::with_capacity(remaining.len());

        for node in remaining {
            // Only edges to sibling nodes constrain the order; plain
            // decoders are always prepped before any composite.
            let ready = node
                .subs
                .iter()
                .all(|sub| !node_names.contains(sub) || emitted.contains(sub));
            if ready {
                emitted.insert(node.name.clone());
                ordered.push(node);
                stalled = false;
            } else {
                deferred.push(node);
            }
        }

        if stalled {
            let names = deferred
                .iter()
                .map(|n| n.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(PipelineError::CyclicDependency { names });
        }
        remaining = deferred;
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn position(ordered: &[MultiDecoderNode], name: &str) -> usize {
        ordered.iter().position(|n| n.name == name).unwrap()
    }

    #[test]
    fn test_single_node() {
        let nodes = vec![MultiDecoderNode::new(
            "ComboDecoder",
            vec!["ADecoder".to_string()],
        )];
        let ordered = order_multi_decoders(nodes, &known(&["ADecoder"])).unwrap();
        assert_eq!(ordered.len(), 1);
    }

    #[test]
    fn test_nested_composites_ordered_after_subs() {
        let nodes = vec![
            MultiDecoderNode::new("OuterDecoder", vec!["InnerDecoder".to_string()]),
            MultiDecoderNode::new("InnerDecoder", vec!["LeafDecoder".to_string()]),
        ];
        let ordered = order_multi_decoders(nodes, &known(&["LeafDecoder"])).unwrap();
        assert!(position(&ordered, "InnerDecoder") < position(&ordered, "OuterDecoder"));
    }

    #[test]
    fn test_transitive_chain() {
        let nodes = vec![
            MultiDecoderNode::new("CDecoder", vec!["BDecoder".to_string()]),
            MultiDecoderNode::new("ADecoder", vec!["LeafDecoder".to_string()]),
            MultiDecoderNode::new("BDecoder", vec!["ADecoder".to_string()]),
        ];
        let ordered = order_multi_decoders(nodes, &known(&["LeafDecoder"])).unwrap();
        assert!(position(&ordered, "ADecoder") < position(&ordered, "BDecoder"));
        assert!(position(&ordered, "BDecoder") < position(&ordered, "CDecoder"));
    }

    #[test]
    fn test_stable_order_for_independent_nodes() {
        let nodes = vec![
            MultiDecoderNode::new("ZebraDecoder", vec!["LeafDecoder".to_string()]),
            MultiDecoderNode::new("AlphaDecoder", vec!["LeafDecoder".to_string()]),
        ];
        let ordered = order_multi_decoders(nodes, &known(&["LeafDecoder"])).unwrap();
        assert_eq!(ordered[0].name, "ZebraDecoder");
        assert_eq!(ordered[1].name, "AlphaDecoder");
    }

    #[test]
    fn test_cycle_detected() {
        let nodes = vec![
            MultiDecoderNode::new("PingDecoder", vec!["PongDecoder".to_string()]),
            MultiDecoderNode::new("PongDecoder", vec!["PingDecoder".to_string()]),
        ];
        let err = order_multi_decoders(nodes, &known(&[])).unwrap_err();
        match err {
            PipelineError::CyclicDependency { names } => {
                assert!(names.contains("PingDecoder"));
                assert!(names.contains("PongDecoder"));
            }
            other => panic!("expected CyclicDependency, got {other}"),
        }
    }

    #[test]
    fn test_self_cycle_detected() {
        let nodes = vec![MultiDecoderNode::new(
            "EchoDecoder",
            vec!["EchoDecoder".to_string()],
        )];
        let err = order_multi_decoders(nodes, &known(&[])).unwrap_err();
        assert!(matches!(err, PipelineError::CyclicDependency { .. }));
    }

    #[test]
    fn test_unknown_sub_detected() {
        let nodes = vec![MultiDecoderNode::new(
            "ComboDecoder",
            vec!["GhostDecoder".to_string()],
        )];
        let err = order_multi_decoders(nodes, &known(&["RealDecoder"])).unwrap_err();
        match err {
            PipelineError::UnknownSubDecoder { decoder, sub } => {
                assert_eq!(decoder, "ComboDecoder");
                assert_eq!(sub, "GhostDecoder");
            }
            other => panic!("expected UnknownSubDecoder, got {other}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let ordered = order_multi_decoders(Vec::new(), &known(&[])).unwrap();
        assert!(ordered.is_empty());
    }
}
