//! Ruling lines and the table cells they enclose (lattice mode).
//!
//! Painted path segments that are horizontal or vertical become edges.
//! Nearly collinear edges are snapped onto one line and overlapping pieces
//! joined. Wherever a horizontal and a vertical edge cross there is a
//! vertex, and the smallest rectangle of connected vertices below and to
//! the right of each vertex is a cell. Cells sharing a corner form a table.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::table::TableDetectorConfig;

/// Segments whose ends differ by less than this on one axis are axis-aligned.
const AXIS_EPSILON: f32 = 0.5;

/// Direction of a ruling edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Constant Y
    Horizontal,
    /// Constant X
    Vertical,
}

/// An axis-aligned ruling line in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Horizontal or vertical
    pub orientation: Orientation,
    /// Y of a horizontal edge, X of a vertical one
    pub pos: f32,
    /// Lower end along the edge
    pub start: f32,
    /// Upper end along the edge
    pub end: f32,
}

impl Edge {
    /// Edge for the segment `p`–`q`, if it is horizontal or vertical.
    pub fn from_segment(p: (f32, f32), q: (f32, f32)) -> Option<Self> {
        if (p.1 - q.1).abs() < AXIS_EPSILON {
            Some(Self {
                orientation: Orientation::Horizontal,
                pos: (p.1 + q.1) / 2.0,
                start: p.0.min(q.0),
                end: p.0.max(q.0),
            })
        } else if (p.0 - q.0).abs() < AXIS_EPSILON {
            Some(Self {
                orientation: Orientation::Vertical,
                pos: (p.0 + q.0) / 2.0,
                start: p.1.min(q.1),
                end: p.1.max(q.1),
            })
        } else {
            None
        }
    }

    /// Length along the edge.
    pub fn length(&self) -> f32 {
        self.end - self.start
    }
}

/// Path construction state between painting operators.
///
/// Points arrive already transformed to user space.
#[derive(Debug, Default)]
pub(crate) struct PathBuilder {
    segments: Vec<((f32, f32), (f32, f32))>,
    start: Option<(f32, f32)>,
    current: Option<(f32, f32)>,
}

impl PathBuilder {
    pub(crate) fn move_to(&mut self, p: (f32, f32)) {
        self.start = Some(p);
        self.current = Some(p);
    }

    pub(crate) fn line_to(&mut self, p: (f32, f32)) {
        match self.current {
            Some(c) => self.segments.push((c, p)),
            None => self.start = Some(p),
        }
        self.current = Some(p);
    }

    /// Curves never form ruling lines; only the current point moves.
    pub(crate) fn curve_to(&mut self, p: (f32, f32)) {
        if self.current.is_none() {
            self.start = Some(p);
        }
        self.current = Some(p);
    }

    pub(crate) fn close(&mut self) {
        if let (Some(s), Some(c)) = (self.start, self.current) {
            if s != c {
                self.segments.push((c, s));
            }
        }
        self.current = self.start;
    }

    /// A rectangle given by its four transformed corners, in drawing order.
    pub(crate) fn rect(&mut self, corners: [(f32, f32); 4]) {
        self.move_to(corners[0]);
        for &corner in &corners[1..] {
            self.line_to(corner);
        }
        self.close();
    }

    /// Paint the path: return its axis-aligned edges and start over.
    pub(crate) fn paint(&mut self) -> Vec<Edge> {
        let edges = self
            .segments
            .drain(..)
            .filter_map(|(p, q)| Edge::from_segment(p, q))
            .collect();
        self.clear();
        edges
    }

    /// End the path without painting it (`n`, clipping paths).
    pub(crate) fn clear(&mut self) {
        self.segments.clear();
        self.start = None;
        self.current = None;
    }
}

/// A table cell in user space (Y grows upwards).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Cell {
    pub(crate) x0: f32,
    pub(crate) x1: f32,
    pub(crate) bottom: f32,
    pub(crate) top: f32,
}

impl Cell {
    pub(crate) fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.bottom && y < self.top
    }

    fn corners(&self) -> [VertexKey; 4] {
        [
            key(self.x0, self.top),
            key(self.x1, self.top),
            key(self.x0, self.bottom),
            key(self.x1, self.bottom),
        ]
    }
}

type VertexKey = (u32, u32);

fn key(x: f32, y: f32) -> VertexKey {
    (x.to_bits(), y.to_bits())
}

#[derive(Debug)]
struct Vertex {
    x: f32,
    y: f32,
    horizontals: Vec<usize>,
    verticals: Vec<usize>,
}

/// Find tables bounded by ruling lines. Each table is a list of cells;
/// tables come top of the page first.
pub(crate) fn find_tables(edges: &[Edge], config: &TableDetectorConfig) -> Vec<Vec<Cell>> {
    let edges = merge_edges(edges, config);
    let vertices = intersections(&edges, config.intersection_tolerance);
    let cells = find_cells(&vertices);

    log::debug!(
        "Lattice: {} edges, {} vertices, {} cells",
        edges.len(),
        vertices.len(),
        cells.len()
    );

    let mut tables = group_cells(cells);
    // A lone cell is a box around something, not a table.
    tables.retain(|cells| cells.len() > 1);
    tables.sort_by(|a, b| {
        let (a_top, a_x0) = table_origin(a);
        let (b_top, b_x0) = table_origin(b);
        b_top
            .partial_cmp(&a_top)
            .unwrap_or(Ordering::Equal)
            .then(a_x0.partial_cmp(&b_x0).unwrap_or(Ordering::Equal))
    });
    tables
}

fn table_origin(cells: &[Cell]) -> (f32, f32) {
    let top = cells.iter().map(|c| c.top).fold(f32::MIN, f32::max);
    let x0 = cells.iter().map(|c| c.x0).fold(f32::MAX, f32::min);
    (top, x0)
}

/// Snap, join and length-filter edges.
fn merge_edges(edges: &[Edge], config: &TableDetectorConfig) -> Vec<Edge> {
    let mut edges = edges.to_vec();
    snap(&mut edges, Orientation::Horizontal, config.snap_tolerance);
    snap(&mut edges, Orientation::Vertical, config.snap_tolerance);

    edges.sort_by(|a, b| {
        (a.orientation as u8)
            .cmp(&(b.orientation as u8))
            .then(a.pos.partial_cmp(&b.pos).unwrap_or(Ordering::Equal))
            .then(a.start.partial_cmp(&b.start).unwrap_or(Ordering::Equal))
    });

    let mut joined: Vec<Edge> = Vec::with_capacity(edges.len());
    for edge in edges {
        match joined.last_mut() {
            Some(last)
                if last.orientation == edge.orientation
                    && last.pos == edge.pos
                    && edge.start <= last.end + config.join_tolerance =>
            {
                last.end = last.end.max(edge.end);
            }
            _ => joined.push(edge),
        }
    }

    joined.retain(|e| e.length() >= config.edge_min_length);
    joined
}

/// Move parallel edges whose positions chain within `tolerance` onto
/// their mean position.
fn snap(edges: &mut [Edge], orientation: Orientation, tolerance: f32) {
    let mut indices: Vec<usize> = (0..edges.len())
        .filter(|&i| edges[i].orientation == orientation)
        .collect();
    indices.sort_by(|&a, &b| {
        edges[a]
            .pos
            .partial_cmp(&edges[b].pos)
            .unwrap_or(Ordering::Equal)
    });

    let mut cluster: Vec<usize> = Vec::new();
    for i in indices {
        if let Some(&last) = cluster.last() {
            if edges[i].pos - edges[last].pos > tolerance {
                settle(edges, &cluster);
                cluster.clear();
            }
        }
        cluster.push(i);
    }
    settle(edges, &cluster);
}

fn settle(edges: &mut [Edge], cluster: &[usize]) {
    if cluster.is_empty() {
        return;
    }
    let mean = cluster.iter().map(|&i| edges[i].pos).sum::<f32>() / cluster.len() as f32;
    for &i in cluster {
        edges[i].pos = mean;
    }
}

fn intersections(edges: &[Edge], tolerance: f32) -> Vec<Vertex> {
    let mut index: HashMap<VertexKey, usize> = HashMap::new();
    let mut vertices: Vec<Vertex> = Vec::new();

    for (vi, v) in edges.iter().enumerate() {
        if v.orientation != Orientation::Vertical {
            continue;
        }
        for (hi, h) in edges.iter().enumerate() {
            if h.orientation != Orientation::Horizontal {
                continue;
            }
            let crosses = v.pos >= h.start - tolerance
                && v.pos <= h.end + tolerance
                && h.pos >= v.start - tolerance
                && h.pos <= v.end + tolerance;
            if !crosses {
                continue;
            }

            let slot = *index.entry(key(v.pos, h.pos)).or_insert_with(|| {
                vertices.push(Vertex {
                    x: v.pos,
                    y: h.pos,
                    horizontals: Vec::new(),
                    verticals: Vec::new(),
                });
                vertices.len() - 1
            });
            vertices[slot].horizontals.push(hi);
            vertices[slot].verticals.push(vi);
        }
    }

    // Left to right, and top to bottom within a column.
    vertices.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(Ordering::Equal)
            .then(b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal))
    });
    vertices
}

fn share_any(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|i| b.contains(i))
}

/// Whether one ruling line runs between two vertices on the same row or
/// column.
fn connected(a: &Vertex, b: &Vertex) -> bool {
    if a.x == b.x {
        share_any(&a.verticals, &b.verticals)
    } else if a.y == b.y {
        share_any(&a.horizontals, &b.horizontals)
    } else {
        false
    }
}

fn find_cells(vertices: &[Vertex]) -> Vec<Cell> {
    let index: HashMap<VertexKey, usize> = vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (key(v.x, v.y), i))
        .collect();

    let mut cells = Vec::new();
    for (i, corner) in vertices.iter().enumerate() {
        let rest = &vertices[i + 1..];
        let below: Vec<&Vertex> = rest.iter().filter(|v| v.x == corner.x).collect();
        let right: Vec<&Vertex> = rest.iter().filter(|v| v.y == corner.y).collect();

        'search: for b in &below {
            if !connected(corner, b) {
                continue;
            }
            for r in &right {
                if !connected(corner, r) {
                    continue;
                }
                let Some(&opposite) = index.get(&key(r.x, b.y)) else {
                    continue;
                };
                let opposite = &vertices[opposite];
                if connected(opposite, r) && connected(opposite, b) {
                    cells.push(Cell {
                        x0: corner.x,
                        x1: r.x,
                        bottom: b.y,
                        top: corner.y,
                    });
                    break 'search;
                }
            }
        }
    }
    cells
}

/// Group cells that share a corner.
fn group_cells(cells: Vec<Cell>) -> Vec<Vec<Cell>> {
    let mut parent: Vec<usize> = (0..cells.len()).collect();

    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut owner: HashMap<VertexKey, usize> = HashMap::new();
    for (i, cell) in cells.iter().enumerate() {
        for corner in cell.corners() {
            match owner.get(&corner) {
                Some(&j) => {
                    let (a, b) = (root(&mut parent, i), root(&mut parent, j));
                    if a != b {
                        parent[a] = b;
                    }
                }
                None => {
                    owner.insert(corner, i);
                }
            }
        }
    }

    let mut groups: HashMap<usize, Vec<Cell>> = HashMap::new();
    for (i, cell) in cells.into_iter().enumerate() {
        let r = root(&mut parent, i);
        groups.entry(r).or_default().push(cell);
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(y: f32, x0: f32, x1: f32) -> Edge {
        Edge::from_segment((x0, y), (x1, y)).unwrap()
    }

    fn v(x: f32, y0: f32, y1: f32) -> Edge {
        Edge::from_segment((x, y0), (x, y1)).unwrap()
    }

    /// Ruling for a grid with the given column and row boundaries.
    fn grid(xs: &[f32], ys: &[f32]) -> Vec<Edge> {
        let (left, right) = (xs[0], xs[xs.len() - 1]);
        let (bottom, top) = (ys[ys.len() - 1], ys[0]);
        ys.iter()
            .map(|&y| h(y, left, right))
            .chain(xs.iter().map(|&x| v(x, bottom, top)))
            .collect()
    }

    #[test]
    fn test_edge_from_segment() {
        let e = Edge::from_segment((100.0, 50.2), (20.0, 50.0)).unwrap();
        assert_eq!(e.orientation, Orientation::Horizontal);
        assert_eq!((e.start, e.end), (20.0, 100.0));

        let e = Edge::from_segment((30.0, 10.0), (30.0, 90.0)).unwrap();
        assert_eq!(e.orientation, Orientation::Vertical);
        assert_eq!(e.length(), 80.0);

        assert!(Edge::from_segment((0.0, 0.0), (10.0, 10.0)).is_none());
    }

    #[test]
    fn test_path_builder_rect() {
        let mut path = PathBuilder::default();
        path.rect([(0.0, 0.0), (50.0, 0.0), (50.0, 20.0), (0.0, 20.0)]);
        let edges = path.paint();
        assert_eq!(edges.len(), 4);
        assert_eq!(
            edges
                .iter()
                .filter(|e| e.orientation == Orientation::Vertical)
                .count(),
            2
        );
        assert!(path.paint().is_empty());
    }

    #[test]
    fn test_two_by_two_grid() {
        let edges = grid(&[72.0, 200.0, 330.0], &[500.0, 480.0, 460.0]);
        let tables = find_tables(&edges, &TableDetectorConfig::default());

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 4);
        assert!(tables[0].contains(&Cell {
            x0: 200.0,
            x1: 330.0,
            bottom: 460.0,
            top: 480.0
        }));
    }

    #[test]
    fn test_near_lines_snap_and_pieces_join() {
        // Top rule drawn as two pieces, one of them slightly off.
        let mut edges = vec![
            h(500.0, 72.0, 190.0),
            h(501.5, 188.0, 330.0),
            h(480.0, 72.0, 330.0),
            h(460.0, 72.0, 330.0),
        ];
        edges.extend([72.0, 200.0, 330.0].iter().map(|&x| v(x, 460.0, 500.0)));

        let tables = find_tables(&edges, &TableDetectorConfig::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 4);
    }

    #[test]
    fn test_single_box_is_not_a_table() {
        let edges = grid(&[72.0, 400.0], &[500.0, 300.0]);
        assert!(find_tables(&edges, &TableDetectorConfig::default()).is_empty());
    }

    #[test]
    fn test_separate_grids_top_first() {
        let mut edges = grid(&[72.0, 200.0, 330.0], &[300.0, 280.0]);
        edges.extend(grid(&[72.0, 200.0, 330.0], &[500.0, 480.0]));

        let tables = find_tables(&edges, &TableDetectorConfig::default());
        assert_eq!(tables.len(), 2);
        assert!(tables[0].iter().all(|c| c.top == 500.0));
        assert!(tables[1].iter().all(|c| c.top == 300.0));
    }

    #[test]
    fn test_no_edges() {
        assert!(find_tables(&[], &TableDetectorConfig::default()).is_empty());
    }
}
