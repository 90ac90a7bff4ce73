//! Rectilinear Steiner topologies over the pins of one net.
//!
//! A [`SteinerTree`] is a rooted binary tree stored as an arena. The root is
//! the driver point and carries the net's driving pin. Every other pin sits on
//! a leaf, and internal points are synthesized Steiner junctions with exactly
//! two children and no pin.
//!
//! Construction starts from a rectilinear minimum spanning tree grown from the
//! driver. Each sink with MST children is pushed out to a leaf under a new
//! junction, wide fan-outs are split into chains of junctions, and finally every
//! junction is moved to the median of its three neighbours, which never
//! lengthens the tree.

use itertools::Itertools;
use log::{trace, warn};

use crate::design::Design;
use crate::netlist::{NetId, PinId, Point};

/// Maximum number of median refinement sweeps.
const REFINE_PASSES: usize = 4;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SteinerPoint(usize);

impl SteinerPoint {
    #[inline]
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A pin to be connected by the tree.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Terminal {
    pub pin: PinId,
    pub location: Point,
    pub capacitance: f64,
}

#[derive(Debug, Clone)]
struct Node {
    location: Point,
    pin: Option<PinId>,
    capacitance: f64,
    parent: Option<SteinerPoint>,
    left: Option<SteinerPoint>,
    right: Option<SteinerPoint>,
}

#[derive(Debug, Clone)]
pub struct SteinerTree {
    nodes: Vec<Node>,
    driver: SteinerPoint,
    dbu_per_micron: f64,
}

impl SteinerTree {
    /// Builds the topology of `net`.
    ///
    /// Returns `None` if the net is gone, has no pins, or has no single
    /// instance driver.
    pub fn create(design: &Design, net: NetId) -> Option<SteinerTree> {
        let netlist = &design.netlist;
        let n = netlist.try_net(net).ok()?;
        if n.pins().is_empty() {
            trace!("{}: no pins", n.name);
            return None;
        }
        let drivers = netlist.driver_pins(net);
        let driver = match drivers.as_slice() {
            [driver] => *driver,
            [] => {
                trace!("{}: no instance driver", n.name);
                return None;
            }
            _ => {
                warn!("{}: {} instance drivers", n.name, drivers.len());
                return None;
            }
        };

        let terminal = |pin: PinId| Terminal {
            pin,
            location: design.location(pin),
            capacitance: design.pin_capacitance(pin),
        };
        let sinks = n
            .pins()
            .iter()
            .copied()
            .filter(|&p| p != driver)
            .map(|p| (design.path_name(p), p))
            .sorted()
            .map(|(_, p)| terminal(p))
            .collect_vec();

        Some(Self::from_terminals(
            terminal(driver),
            &sinks,
            design.settings.dbu_per_micron,
        ))
    }

    /// Builds a tree rooted at `driver` connecting every sink.
    pub fn from_terminals(driver: Terminal, sinks: &[Terminal], dbu_per_micron: u32) -> Self {
        let terminals = std::iter::once(driver)
            .chain(sinks.iter().copied())
            .collect_vec();
        let children = spanning_tree(&terminals);

        let mut tree = SteinerTree {
            nodes: Vec::with_capacity(2 * terminals.len()),
            driver: SteinerPoint(0),
            dbu_per_micron: dbu_per_micron.max(1) as f64,
        };
        let root = tree.push(driver.location, Some(driver.pin), 0.0);
        let subtrees = children[0]
            .iter()
            .map(|&c| tree.emit(&terminals, &children, c))
            .collect_vec();
        match subtrees.as_slice() {
            [] => {}
            [only] => tree.set_children(root, Some(*only), None),
            [left, rest @ ..] => {
                let right = tree.chain(rest, driver.location);
                tree.set_children(root, Some(*left), Some(right));
            }
        }
        tree.refine();
        tree
    }

    fn push(&mut self, location: Point, pin: Option<PinId>, capacitance: f64) -> SteinerPoint {
        let id = SteinerPoint(self.nodes.len());
        self.nodes.push(Node {
            location,
            pin,
            capacitance,
            parent: None,
            left: None,
            right: None,
        });
        id
    }

    fn set_children(
        &mut self,
        p: SteinerPoint,
        left: Option<SteinerPoint>,
        right: Option<SteinerPoint>,
    ) {
        for child in [left, right].into_iter().flatten() {
            self.nodes[child.0].parent = Some(p);
        }
        let node = &mut self.nodes[p.0];
        node.left = left;
        node.right = right;
    }

    /// Emits the MST subtree rooted at sink terminal `v`.
    ///
    /// Spanning trees of collinear sinks are as deep as the net is wide, so
    /// the walk keeps its own stack. A terminal's junctions are built once all
    /// of its children have been emitted.
    fn emit(&mut self, terminals: &[Terminal], children: &[Vec<usize>], v: usize) -> SteinerPoint {
        struct Frame {
            v: usize,
            next: usize,
            items: Vec<SteinerPoint>,
        }

        let frame = |tree: &mut Self, v: usize| {
            let t = terminals[v];
            Frame {
                v,
                next: 0,
                items: vec![tree.push(t.location, Some(t.pin), t.capacitance)],
            }
        };

        let mut stack = vec![frame(self, v)];
        while let Some(mut top) = stack.pop() {
            if let Some(&c) = children[top.v].get(top.next) {
                top.next += 1;
                stack.push(top);
                stack.push(frame(self, c));
                continue;
            }
            let subtree = self.chain(&top.items, terminals[top.v].location);
            match stack.last_mut() {
                Some(parent) => parent.items.push(subtree),
                None => return subtree,
            }
        }
        unreachable!("emit stack drained before the root was joined")
    }

    /// Joins `items` under a right-leaning chain of junctions at `location`.
    fn chain(&mut self, items: &[SteinerPoint], location: Point) -> SteinerPoint {
        let Some((&last, rest)) = items.split_last() else {
            unreachable!("chain of no subtrees");
        };
        let junctions = rest
            .iter()
            .map(|_| self.push(location, None, 0.0))
            .collect_vec();
        let mut right = last;
        for (&junction, &left) in junctions.iter().zip(rest).rev() {
            self.set_children(junction, Some(left), Some(right));
            right = junction;
        }
        right
    }

    /// Moves each junction to the median of its neighbours until nothing moves.
    fn refine(&mut self) {
        for _ in 0..REFINE_PASSES {
            let mut moved = false;
            for i in 0..self.nodes.len() {
                let node = &self.nodes[i];
                let (Some(parent), Some(left), Some(right), None) =
                    (node.parent, node.left, node.right, node.pin)
                else {
                    continue;
                };
                let [a, b, c] = [parent, left, right].map(|p| self.nodes[p.0].location);
                let median = Point::new(median3(a.x, b.x, c.x), median3(a.y, b.y, c.y));
                if median != node.location {
                    self.nodes[i].location = median;
                    moved = true;
                }
            }
            if !moved {
                break;
            }
        }
    }

    #[inline]
    pub fn driver_point(&self) -> SteinerPoint {
        self.driver
    }

    #[inline]
    pub fn left(&self, p: SteinerPoint) -> Option<SteinerPoint> {
        self.nodes[p.0].left
    }

    #[inline]
    pub fn right(&self, p: SteinerPoint) -> Option<SteinerPoint> {
        self.nodes[p.0].right
    }

    #[inline]
    pub fn parent(&self, p: SteinerPoint) -> Option<SteinerPoint> {
        self.nodes[p.0].parent
    }

    #[inline]
    pub fn pin(&self, p: SteinerPoint) -> Option<PinId> {
        self.nodes[p.0].pin
    }

    #[inline]
    pub fn location(&self, p: SteinerPoint) -> Point {
        self.nodes[p.0].location
    }

    #[inline]
    pub fn is_leaf(&self, p: SteinerPoint) -> bool {
        self.left(p).is_none() && self.right(p).is_none()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = SteinerPoint> {
        (0..self.nodes.len()).map(SteinerPoint)
    }

    fn children(&self, p: SteinerPoint) -> impl Iterator<Item = SteinerPoint> {
        [self.left(p), self.right(p)].into_iter().flatten()
    }

    /// Rectilinear distance between two points, in database units.
    #[inline]
    pub fn distance(&self, a: SteinerPoint, b: SteinerPoint) -> i64 {
        self.location(a).manhattan(&self.location(b))
    }

    /// Length of the wire from the driver point down to `p`, in database units.
    pub fn driver_wire_length(&self, p: SteinerPoint) -> i64 {
        let mut length = 0;
        let mut cur = p;
        while let Some(parent) = self.parent(cur) {
            length += self.distance(parent, cur);
            cur = parent;
        }
        length
    }

    /// Points of the subtree rooted at `p`, in pre-order, left before right.
    pub fn subtree(&self, p: SteinerPoint) -> Vec<SteinerPoint> {
        let mut out = Vec::new();
        let mut stack = vec![p];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            if let Some(right) = self.right(cur) {
                stack.push(right);
            }
            if let Some(left) = self.left(cur) {
                stack.push(left);
            }
        }
        out
    }

    /// Leaves of the subtree rooted at `p`, left to right.
    pub fn leaves(&self, p: SteinerPoint) -> Vec<SteinerPoint> {
        self.subtree(p)
            .into_iter()
            .filter(|&q| self.is_leaf(q))
            .collect()
    }

    /// Total length of the wires strictly below `p`, in database units.
    pub fn subtree_wire_length(&self, p: SteinerPoint) -> i64 {
        self.subtree(p)
            .into_iter()
            .flat_map(|q| self.children(q).map(move |c| (q, c)))
            .map(|(q, c)| self.distance(q, c))
            .sum()
    }

    #[inline]
    pub fn total_wire_length(&self) -> i64 {
        self.subtree_wire_length(self.driver)
    }

    /// Sink pin capacitance plus wire capacitance of the subtree rooted at `p`.
    pub fn subtree_load(&self, cap_per_micron: f64, p: SteinerPoint) -> f64 {
        let pin_cap: f64 = self
            .subtree(p)
            .into_iter()
            .filter(|&q| q != self.driver)
            .map(|q| self.nodes[q.0].capacitance)
            .sum();
        let wire = self.subtree_wire_length(p) as f64 / self.dbu_per_micron;
        pin_cap + cap_per_micron * wire
    }

    #[inline]
    pub fn total_load(&self, cap_per_micron: f64) -> f64 {
        self.subtree_load(cap_per_micron, self.driver)
    }
}

/// Prim's algorithm over rectilinear distances, grown from terminal 0.
/// Returns the child lists of the resulting tree.
fn spanning_tree(terminals: &[Terminal]) -> Vec<Vec<usize>> {
    let n = terminals.len();
    let mut children = vec![Vec::new(); n];
    let mut in_tree = vec![false; n];
    let mut best = vec![i64::MAX; n];
    let mut parent = vec![0usize; n];
    if n == 0 {
        return children;
    }
    best[0] = 0;

    for _ in 0..n {
        let Some(u) = (0..n)
            .filter(|&i| !in_tree[i])
            .min_by_key(|&i| (best[i], i))
        else {
            break;
        };
        in_tree[u] = true;
        if u != 0 {
            children[parent[u]].push(u);
        }
        for v in 0..n {
            if in_tree[v] {
                continue;
            }
            let d = terminals[u].location.manhattan(&terminals[v].location);
            if d < best[v] {
                best[v] = d;
                parent[v] = u;
            }
        }
    }
    children
}

fn median3(a: i64, b: i64, c: i64) -> i64 {
    a.max(b).min(a.min(b).max(c))
}
