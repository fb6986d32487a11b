use crate::graph::AdjacencyGraph;

/// Disjoint-set forest with path halving and union by size.
struct DisjointSets {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), size: vec![1; n] }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut a, mut b) = (self.find(a), self.find(b));
        if a == b { return }
        if self.size[a] < self.size[b] { std::mem::swap(&mut a, &mut b) }
        self.parent[b] = a;
        self.size[a] += self.size[b];
    }
}

impl AdjacencyGraph {
    /// Connected components, treating every link as undirected.
    ///
    /// Components are listed in order of their smallest member; members are sorted.
    /// Each island forms a component of its own.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.node_count();
        let mut sets = DisjointSets::new(n);
        for i in 0..n {
            for j in self.neighbors(i) {
                sets.union(i, j);
            }
        }

        let mut slot = vec![usize::MAX; n];
        let mut components: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = sets.find(i);
            if slot[root] == usize::MAX {
                slot[root] = components.len();
                components.push(Vec::new());
            }
            components[slot[root]].push(i);
        }
        components
    }

    /// Component label per feature, matching the order of [`AdjacencyGraph::components`].
    pub fn component_labels(&self) -> Vec<usize> {
        let mut labels = vec![0; self.node_count()];
        for (label, members) in self.components().iter().enumerate() {
            for &i in members { labels[i] = label }
        }
        labels
    }
}
