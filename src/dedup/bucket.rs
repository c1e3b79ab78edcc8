/// A single hash-chain slot: the byte hash/length recorded at intern time
/// plus the slab offset the bytes were written to.
#[derive(Clone, Copy)]
pub(super) struct BucketEntry {
    pub hash: u32,
    pub len: u32,
    pub offset: u32,
}

const NODE_CAPACITY: usize = 8;

struct Node {
    entries: [Option<BucketEntry>; NODE_CAPACITY],
}

impl Default for Node {
    fn default() -> Self {
        Node { entries: [None; NODE_CAPACITY] }
    }
}

/// One hash chain: a list of fixed-capacity nodes, grown by allocating a new
/// node only once the last one is full.
#[derive(Default)]
pub(super) struct Bucket {
    nodes: Vec<Node>,
}

impl Bucket {
    pub fn iter(&self) -> impl Iterator<Item = BucketEntry> + '_ {
        self.nodes.iter().flat_map(|node| node.entries.iter().flatten().copied())
    }

    pub fn insert(&mut self, entry: BucketEntry) {
        for node in &mut self.nodes {
            if let Some(slot) = node.entries.iter_mut().find(|s| s.is_none()) {
                *slot = Some(entry);
                return;
            }
        }
        let mut node = Node::default();
        node.entries[0] = Some(entry);
        self.nodes.push(node);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    #[cfg(test)]
    pub fn entry_count(&self) -> usize {
        self.iter().count()
    }
}
