//! Module for building, parsing and representing TSP instances.
//!
//! An instance is a set of nodes with 2D coordinates plus a complete directed
//! cost matrix. Costs need not be symmetric and arcs may be missing: a
//! negative cost is the sentinel for "no arc".

use crate::error::{try_vec_with_capacity, SolverError, SolverResult};
use rand::distributions::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Cost of a missing arc.
pub const NO_ARC: f64 = -1.0;

/// Represents a node of the instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier, unique within an instance
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Node {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        Node { id, x, y }
    }
}

/// Cost function choices used to build the cost matrix from coordinates
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum CostFunction {
    Euclidean,
    Manhattan,
    Minkowski { p: f64 },
    /// Minkowski distance plus a normal perturbation seeded by the pair of
    /// identifiers. Arcs costing more than `threshold` are removed.
    Unfair {
        p: f64,
        mean: f64,
        sigma: f64,
        threshold: f64,
    },
}

impl CostFunction {
    /// Cost of the arc from `a` to `b`
    pub fn cost(&self, a: &Node, b: &Node) -> f64 {
        match *self {
            CostFunction::Euclidean => minkowski(a, b, 2.0),
            CostFunction::Manhattan => (a.x - b.x).abs() + (a.y - b.y).abs(),
            CostFunction::Minkowski { p } => minkowski(a, b, p),
            CostFunction::Unfair { p, mean, sigma, threshold } => {
                if a.id == b.id {
                    return 0.0;
                }
                let seed = (a.id as u64).wrapping_sub(b.id as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let noise = match Normal::new(mean, sigma) {
                    Ok(normal) => normal.sample(&mut rng),
                    // Degenerate spread: the perturbation is the mean itself
                    Err(_) => mean,
                };
                let cost = (minkowski(a, b, p) + noise).abs();
                if cost <= threshold {
                    cost
                } else {
                    NO_ARC
                }
            }
        }
    }
}

fn minkowski(a: &Node, b: &Node, p: f64) -> f64 {
    let dx = (a.x - b.x).abs();
    let dy = (a.y - b.y).abs();
    (dx.powf(p) + dy.powf(p)).powf(1.0 / p)
}

/// Represents a complete TSP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Name of the instance
    pub name: String,
    /// Nodes, in the order they were given
    nodes: Vec<Node>,
    /// Smallest node identifier
    min_id: usize,
    /// Side of the cost matrix (`max_id - min_id + 1`)
    map_size: usize,
    /// Row-major cost matrix indexed by `id - min_id`
    costs: Vec<f64>,
}

/// Number of ids in `min_id..=max_id`; `None` when the range is empty or
/// does not fit in a `usize`
fn id_span(min_id: usize, max_id: usize) -> Option<usize> {
    max_id.checked_sub(min_id)?.checked_add(1)
}

impl Instance {
    /// Build an instance by applying a cost function to every ordered pair of nodes
    pub fn new(name: &str, nodes: Vec<Node>, cost_function: &CostFunction) -> SolverResult<Self> {
        let mut instance = Self::empty(name, nodes)?;
        for a in &instance.nodes {
            for b in &instance.nodes {
                let slot = instance.slot(a.id, b.id);
                instance.costs[slot] = cost_function.cost(a, b);
            }
        }
        Ok(instance)
    }

    /// Build an instance from an explicit matrix where `rows[i][j]` is the cost
    /// from `nodes[i]` to `nodes[j]`
    pub fn from_matrix(name: &str, nodes: Vec<Node>, rows: Vec<Vec<f64>>) -> SolverResult<Self> {
        if rows.len() != nodes.len() || rows.iter().any(|row| row.len() != nodes.len()) {
            return Err(SolverError::Validation(format!(
                "cost matrix must be {}x{}",
                nodes.len(),
                nodes.len()
            )));
        }

        let mut instance = Self::empty(name, nodes)?;
        for (i, row) in rows.iter().enumerate() {
            for (j, &cost) in row.iter().enumerate() {
                let slot = instance.slot(instance.nodes[i].id, instance.nodes[j].id);
                instance.costs[slot] = cost;
            }
        }
        Ok(instance)
    }

    /// Validate nodes and allocate a matrix with every arc missing
    fn empty(name: &str, nodes: Vec<Node>) -> SolverResult<Self> {
        if nodes.is_empty() {
            return Err(SolverError::Validation("an instance needs at least one node".to_string()));
        }

        let mut seen = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if !seen.insert(node.id) {
                return Err(SolverError::Validation(format!("duplicate node id {}", node.id)));
            }
        }

        let min_id = nodes.iter().map(|n| n.id).min().unwrap_or(0);
        let max_id = nodes.iter().map(|n| n.id).max().unwrap_or(0);
        let map_size = id_span(min_id, max_id)
            .ok_or_else(|| SolverError::Validation(format!("node ids {}..={} span too many values", min_id, max_id)))?;
        let cells = map_size
            .checked_mul(map_size)
            .ok_or_else(|| SolverError::Allocation(format!("{}x{} cost matrix", map_size, map_size)))?;

        let mut costs = try_vec_with_capacity(cells, "cost matrix")?;
        costs.resize(cells, NO_ARC);

        Ok(Instance {
            name: name.to_string(),
            nodes,
            min_id,
            map_size,
            costs,
        })
    }

    #[inline]
    fn slot(&self, a: usize, b: usize) -> usize {
        (a - self.min_id) * self.map_size + (b - self.min_id)
    }

    /// Number of nodes
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes in instance order; position `i` is internal index `i`
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Look up a node by identifier
    pub fn node(&self, id: usize) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn contains_id(&self, id: usize) -> bool {
        id >= self.min_id && id - self.min_id < self.map_size
    }

    /// Cost of the arc between two node identifiers; negative when the arc is
    /// missing or an identifier is unknown
    #[inline]
    pub fn cost_between(&self, a: usize, b: usize) -> f64 {
        if !self.contains_id(a) || !self.contains_id(b) {
            return NO_ARC;
        }
        self.costs[self.slot(a, b)]
    }

    /// Whether the arc from `a` to `b` exists
    pub fn has_arc(&self, a: usize, b: usize) -> bool {
        self.cost_between(a, b) >= 0.0
    }

    /// Write the instance in the plain text format
    pub fn save<W: Write>(&self, writer: &mut W) -> SolverResult<()> {
        let max_id = self.min_id + self.map_size - 1;
        writeln!(writer, "{} {} {} {}", self.nodes.len(), self.map_size, self.min_id, max_id)?;
        for node in &self.nodes {
            writeln!(writer, "{} {} {}", node.id, node.x, node.y)?;
        }
        for row in self.costs.chunks(self.map_size) {
            let line: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            writeln!(writer, "{}", line.join(" "))?;
        }
        Ok(())
    }

    /// Parse an instance from the plain text format
    pub fn load<R: BufRead>(reader: R, name: &str) -> SolverResult<Self> {
        let mut tokens = TokenReader::from_reader(reader)?;

        let size: usize = tokens.next("instance size")?;
        let map_size: usize = tokens.next("map size")?;
        let min_id: usize = tokens.next("minimum id")?;
        let max_id: usize = tokens.next("maximum id")?;

        if id_span(min_id, max_id) != Some(map_size) {
            return Err(tokens.error(format!(
                "map size {} does not match id range {}..={}",
                map_size, min_id, max_id
            )));
        }

        let mut nodes = try_vec_with_capacity(size, "nodes")?;
        for _ in 0..size {
            let id: usize = tokens.next("node id")?;
            let x: f64 = tokens.next("x coordinate")?;
            let y: f64 = tokens.next("y coordinate")?;
            if id < min_id || id > max_id {
                return Err(tokens.error(format!("node id {} outside {}..={}", id, min_id, max_id)));
            }
            nodes.push(Node::new(id, x, y));
        }

        let mut instance = Self::empty(name, nodes)?;
        if instance.min_id != min_id || instance.map_size != map_size {
            return Err(tokens.error("header id range does not match the nodes".to_string()));
        }
        for cell in instance.costs.iter_mut() {
            *cell = tokens.next("cost")?;
        }

        Ok(instance)
    }

    /// Load an instance from a file; the name is the file stem
    pub fn from_file<P: AsRef<Path>>(path: P) -> SolverResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "instance".to_string());
        Self::load(BufReader::new(file), &name)
    }

    /// Save the instance to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> SolverResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let mut arcs = 0usize;
        let mut pairs = 0usize;
        let mut total = 0.0;
        let mut max_cost: f64 = 0.0;
        let mut symmetric = true;

        for a in &self.nodes {
            for b in &self.nodes {
                if a.id == b.id {
                    continue;
                }
                pairs += 1;
                let cost = self.cost_between(a.id, b.id);
                if cost >= 0.0 {
                    arcs += 1;
                    total += cost;
                    max_cost = max_cost.max(cost);
                }
                if (cost - self.cost_between(b.id, a.id)).abs() > 1e-9 {
                    symmetric = false;
                }
            }
        }

        InstanceStatistics {
            name: self.name.clone(),
            dimension: self.nodes.len(),
            arcs,
            density: if pairs > 0 { arcs as f64 / pairs as f64 } else { 0.0 },
            avg_cost: if arcs > 0 { total / arcs as f64 } else { 0.0 },
            max_cost,
            symmetric,
        }
    }
}

/// Statistics about an instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub dimension: usize,
    /// Number of present arcs between distinct nodes
    pub arcs: usize,
    /// Fraction of ordered pairs joined by an arc
    pub density: f64,
    pub avg_cost: f64,
    pub max_cost: f64,
    pub symmetric: bool,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {}", self.dimension)?;
        writeln!(f, "  Arcs: {} (density {:.1}%)", self.arcs, self.density * 100.0)?;
        writeln!(f, "  Symmetric: {}", self.symmetric)?;
        writeln!(f, "  Avg arc cost: {:.2}", self.avg_cost)?;
        writeln!(f, "  Max arc cost: {:.2}", self.max_cost)
    }
}

/// Whitespace-separated token stream that remembers line numbers
pub(crate) struct TokenReader {
    tokens: Vec<(usize, String)>,
    pos: usize,
}

impl TokenReader {
    pub(crate) fn from_reader<R: BufRead>(reader: R) -> SolverResult<Self> {
        let mut tokens = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            tokens.extend(line.split_whitespace().map(|t| (line_no + 1, t.to_string())));
        }
        Ok(TokenReader { tokens, pos: 0 })
    }

    pub(crate) fn next<T: FromStr>(&mut self, what: &str) -> SolverResult<T> {
        let (line, token) = match self.tokens.get(self.pos) {
            Some(entry) => entry,
            None => return Err(self.error(format!("unexpected end of input, expected {}", what))),
        };
        let value = token.parse().map_err(|_| SolverError::Parse {
            line: *line,
            message: format!("invalid {}: '{}'", what, token),
        })?;
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn error(&self, message: String) -> SolverError {
        let line = self
            .tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|(line, _)| *line)
            .unwrap_or(0);
        SolverError::Parse { line, message }
    }
}
