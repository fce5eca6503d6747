//!
//! Weighted state graph of an HMM
//!
//! `StateGraph` is the mutable builder; `FinalizedGraph` is frozen and can be
//! decoded.
//!
use super::emission::Emission;
use crate::error::{Error, Result};
use crate::prob::Prob;
use petgraph::algo::toposort;
use petgraph::dot::Dot;
use petgraph::graph::DiGraph;
pub use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

/// Index of a state in the graph
pub type StateIndex = NodeIndex;

///
/// A state: its label and emission.
/// Start and End are the only states without label.
///
#[derive(Clone, Debug)]
pub struct State<L> {
    pub label: Option<L>,
    pub emission: Emission,
}

impl<L> State<L> {
    pub fn is_silent(&self) -> bool {
        self.emission.is_silent()
    }
}

impl<L: std::fmt::Display> std::fmt::Display for State<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} {}", label, self.emission),
            None => write!(f, "terminal"),
        }
    }
}

///
/// Builder of a state graph.
///
/// ```
/// use poretrain::hmm::{Emission, StateGraph};
/// let mut g = StateGraph::new();
/// let m = g.add_state("m", Emission::normal(80.0, 1.0));
/// g.add_transition(g.start(), m, 1.0);
/// g.add_transition(m, m, 0.5);
/// g.add_transition(m, g.end(), 0.5);
/// let g = g.finalize().unwrap();
/// let path = g.viterbi(&[80.0, 81.0]);
/// assert!(path.is_valid());
/// assert_eq!(path.states, vec![m, m]);
/// ```
///
#[derive(Clone, Debug)]
pub struct StateGraph<L> {
    graph: DiGraph<State<L>, Prob>,
    start: StateIndex,
    end: StateIndex,
}

impl<L> Default for StateGraph<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> StateGraph<L> {
    ///
    /// Empty graph with only Start and End
    ///
    pub fn new() -> Self {
        Self::with_capacity(2, 0)
    }
    ///
    /// Empty graph with space reserved for `n_states` states and
    /// `n_transitions` transitions.
    ///
    pub fn with_capacity(n_states: usize, n_transitions: usize) -> Self {
        let mut graph = DiGraph::with_capacity(n_states + 2, n_transitions);
        let start = graph.add_node(State {
            label: None,
            emission: Emission::Silent,
        });
        let end = graph.add_node(State {
            label: None,
            emission: Emission::Silent,
        });
        StateGraph { graph, start, end }
    }
    pub fn start(&self) -> StateIndex {
        self.start
    }
    pub fn end(&self) -> StateIndex {
        self.end
    }
    ///
    /// Add a labeled state
    ///
    pub fn add_state(&mut self, label: L, emission: Emission) -> StateIndex {
        self.graph.add_node(State {
            label: Some(label),
            emission,
        })
    }
    ///
    /// Add a transition with (unnormalized) weight `p`.
    /// Transitions with `p <= 0` are not added.
    ///
    pub fn add_transition(&mut self, from: StateIndex, to: StateIndex, p: f64) {
        assert_ne!(to, self.start, "no transition can enter the start state");
        assert_ne!(from, self.end, "no transition can leave the end state");
        if p > 0.0 {
            self.graph.add_edge(from, to, Prob::from_prob(p));
        }
    }
    pub fn n_states(&self) -> usize {
        self.graph.node_count()
    }
    pub fn n_transitions(&self) -> usize {
        self.graph.edge_count()
    }
    ///
    /// Freeze the graph for decoding.
    ///
    /// * outgoing weights of every state are normalized to sum to 1
    /// * silent states (other than Start/End) are ordered topologically;
    ///   a cycle of silent states is an error
    ///
    pub fn finalize(self) -> Result<FinalizedGraph<L>> {
        let StateGraph {
            mut graph,
            start,
            end,
        } = self;

        // normalize
        for v in graph.node_indices() {
            let edges: Vec<_> = graph
                .edges_directed(v, Direction::Outgoing)
                .map(|e| e.id())
                .collect();
            let total: Prob = edges.iter().map(|&e| graph[e]).sum();
            if total.is_zero() {
                continue;
            }
            for e in edges {
                graph[e] = graph[e] / total;
            }
        }

        // order the silent states
        let is_inner_silent = |v: NodeIndex| v != start && v != end && graph[v].is_silent();
        let mut silent: DiGraph<NodeIndex, ()> = DiGraph::new();
        let mut local = vec![None; graph.node_count()];
        for v in graph.node_indices().filter(|&v| is_inner_silent(v)) {
            local[v.index()] = Some(silent.add_node(v));
        }
        for e in graph.edge_references() {
            if let (Some(s), Some(t)) = (local[e.source().index()], local[e.target().index()]) {
                silent.add_edge(s, t, ());
            }
        }
        let silent_order: Vec<StateIndex> = toposort(&silent, None)
            .map_err(|_| Error::SilentCycle)?
            .into_iter()
            .map(|v| silent[v])
            .collect();

        let emitting: Vec<StateIndex> = graph
            .node_indices()
            .filter(|&v| !graph[v].is_silent())
            .collect();
        let incoming: Vec<Vec<(u32, Prob)>> = graph
            .node_indices()
            .map(|v| {
                graph
                    .edges_directed(v, Direction::Incoming)
                    .map(|e| (e.source().index() as u32, *e.weight()))
                    .collect()
            })
            .collect();

        Ok(FinalizedGraph {
            graph,
            start,
            end,
            emitting,
            silent_order,
            incoming,
        })
    }
}

///
/// Frozen state graph ready for decoding.
///
#[derive(Clone, Debug)]
pub struct FinalizedGraph<L> {
    graph: DiGraph<State<L>, Prob>,
    start: StateIndex,
    end: StateIndex,
    /// states with an emission, in index order
    pub(super) emitting: Vec<StateIndex>,
    /// silent states except Start/End, in topological order
    pub(super) silent_order: Vec<StateIndex>,
    /// `incoming[v]` = list of (parent index, transition prob)
    pub(super) incoming: Vec<Vec<(u32, Prob)>>,
}

impl<L> FinalizedGraph<L> {
    pub fn start(&self) -> StateIndex {
        self.start
    }
    pub fn end(&self) -> StateIndex {
        self.end
    }
    pub fn n_states(&self) -> usize {
        self.graph.node_count()
    }
    pub fn n_transitions(&self) -> usize {
        self.graph.edge_count()
    }
    pub fn state(&self, v: StateIndex) -> &State<L> {
        &self.graph[v]
    }
    pub fn label(&self, v: StateIndex) -> Option<&L> {
        self.graph[v].label.as_ref()
    }
    pub fn is_silent(&self, v: StateIndex) -> bool {
        self.graph[v].is_silent()
    }
    ///
    /// iterator of all states `(StateIndex, &State)`
    ///
    pub fn states(&self) -> impl Iterator<Item = (StateIndex, &State<L>)> + '_ {
        self.graph.node_indices().map(move |v| (v, &self.graph[v]))
    }
    ///
    /// iterator of the transitions leaving `v`: `(child, prob)`
    ///
    pub fn childs(&self, v: StateIndex) -> impl Iterator<Item = (StateIndex, Prob)> + '_ {
        self.graph
            .edges_directed(v, Direction::Outgoing)
            .map(|e| (e.target(), *e.weight()))
    }
    ///
    /// iterator of the transitions entering `v`: `(parent, prob)`
    ///
    pub fn parents(&self, v: StateIndex) -> impl Iterator<Item = (StateIndex, Prob)> + '_ {
        self.incoming[v.index()]
            .iter()
            .map(|&(w, p)| (NodeIndex::new(w as usize), p))
    }
    ///
    /// transition probability `v -> w` (`p=0` if there is no transition)
    ///
    pub fn trans_prob(&self, v: StateIndex, w: StateIndex) -> Prob {
        self.childs(v)
            .filter(|&(t, _)| t == w)
            .map(|(_, p)| p)
            .sum()
    }
}

impl<L: std::fmt::Display> std::fmt::Display for FinalizedGraph<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", Dot::with_config(&self.graph, &[]))
    }
}
