use log::trace;

use super::{Graph, Path};

/// Transient lookup key for the paths between two nodes
pub fn path_key(src: &str, dst: &str) -> String {
    format!("{}:{}", src, dst)
}

struct Walk<'a> {
    src: &'a str,
    dst: &'a str,
    used: Vec<bool>,
    visited: Vec<&'a str>,
    stack: Vec<usize>,
    found: Vec<Path>,
}

impl Graph {
    /// Recompute every path between each ordered pair of distinct nodes
    ///
    /// Exhaustive on purpose: best path selection filters on bandwidth
    /// across all of them, not just the shortest. Worst case is exponential
    /// in the number of links.
    pub fn find_paths_for_all_pairs(&mut self) {
        self.paths.clear();
        let ids: Vec<String> = self.nodes.keys().cloned().collect();
        for src in &ids {
            for dst in &ids {
                if src == dst {
                    continue;
                }
                let found = self.find_all_paths(src, dst);
                if !found.is_empty() {
                    self.paths.insert(path_key(src, dst), found);
                }
            }
        }
        trace!("Computed paths for {} node pairs", self.paths.len());
    }

    /// Every simple path from `src` to `dst`, in link enumeration order
    pub fn find_all_paths(&self, src: &str, dst: &str) -> Vec<Path> {
        let mut walk = Walk {
            src,
            dst,
            used: vec![false; self.links.len()],
            visited: vec![src],
            stack: Vec::new(),
            found: Vec::new(),
        };
        self.extend_path(src, &mut walk);
        walk.found
    }

    fn extend_path<'a>(&'a self, at: &'a str, walk: &mut Walk<'a>) {
        for (i, link) in self.links.iter().enumerate() {
            if walk.used[i] || link.local_node != at {
                continue;
            }
            // Both ends must be known nodes
            if !self.nodes.contains_key(&link.local_node)
                || !self.nodes.contains_key(&link.remote_node)
            {
                continue;
            }
            if link.remote_node == walk.dst {
                walk.stack.push(i);
                let path = self.build_path(walk);
                walk.found.push(path);
                walk.stack.pop();
                continue;
            }
            if walk.visited.contains(&link.remote_node.as_str()) {
                continue;
            }
            walk.used[i] = true;
            walk.stack.push(i);
            walk.visited.push(&link.remote_node);
            self.extend_path(&link.remote_node, walk);
            walk.visited.pop();
            walk.stack.pop();
            walk.used[i] = false;
        }
    }

    fn build_path(&self, walk: &Walk) -> Path {
        let links: Vec<_> = walk.stack.iter().map(|&i| self.links[i].clone()).collect();
        Path {
            src: walk.src.to_string(),
            dst: walk.dst.to_string(),
            cost: links.iter().map(|l| u64::from(l.igp_metric)).sum(),
            links,
        }
    }

    /// Cheapest path whose every link has strictly more unreserved bandwidth
    /// than needed, first enumerated wins a tie
    pub fn find_best_path(&self, bandwidth_needed: f32, src: &str, dst: &str) -> Option<&Path> {
        let mut best: Option<&Path> = None;
        for path in self.paths.get(&path_key(src, dst))? {
            if !path
                .links
                .iter()
                .all(|link| link.unreserved_bw > bandwidth_needed)
            {
                continue;
            }
            match best {
                Some(current) if current.cost <= path.cost => (),
                _ => best = Some(path),
            }
        }
        best
    }
}
