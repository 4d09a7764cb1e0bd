use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Generates unique prefix-free labels for a set of items given their
/// frequencies: no label is a prefix of another, and items with higher
/// frequencies get shorter labels.
///
/// Labels are paths in an n-ary Huffman tree over an alphabet of
/// `alphabet_size` runes. For each item i, `labels[i]` is a list of indexes
/// into that alphabet. With a binary alphabet {a b}, the label [0, 1, 0]
/// reads "aba".
pub fn label(alphabet_size: usize, freqs: &[u64]) -> Vec<Vec<usize>> {
    assert!(alphabet_size >= 2, "alphabet must have at least two items");

    match freqs.len() {
        0 => return Vec::new(),
        // A single item gets a single-rune label.
        1 => return vec![vec![0]],
        _ => {}
    }

    struct Node {
        freq: u64,
        // Leaf index for leaves, None for branches.
        index: Option<usize>,
        children: Vec<usize>,
    }

    let mut nodes: Vec<Node> = freqs
        .iter()
        .enumerate()
        .map(|(i, &f)| Node { freq: f, index: Some(i), children: Vec::new() })
        .collect();

    // Min-heap keyed by (frequency, insertion sequence). The sequence keeps
    // ties deterministic across runs.
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = nodes
        .iter()
        .enumerate()
        .map(|(id, n)| Reverse((n.freq, id)))
        .collect();

    // The n-ary reduction only works out if the first combine step takes
    // 2 + (n - 2) mod (b - 1) nodes; every later step takes exactly b.
    // Taking b from the start can leave the root underfull and push a long
    // label onto a high-frequency item.
    let mut take = 2 + (freqs.len() - 2) % (alphabet_size - 1);
    while heap.len() > 1 {
        let mut children = Vec::with_capacity(take);
        let mut freq = 0;
        for _ in 0..take {
            match heap.pop() {
                Some(Reverse((f, id))) => {
                    freq += f;
                    children.push(id);
                }
                None => break,
            }
        }
        let id = nodes.len();
        nodes.push(Node { freq, index: None, children });
        heap.push(Reverse((freq, id)));
        take = alphabet_size;
    }

    // Walk the tree from the root, recording the child index taken at each
    // step as the label.
    let root = heap.pop().map(|Reverse((_, id))| id).unwrap_or(0);
    let mut labels = vec![Vec::new(); freqs.len()];
    let mut stack = vec![(root, Vec::new())];
    while let Some((id, prefix)) = stack.pop() {
        if let Some(i) = nodes[id].index {
            labels[i] = prefix;
            continue;
        }
        for (step, &child) in nodes[id].children.iter().enumerate() {
            let mut p = prefix.clone();
            p.push(step);
            stack.push((child, p));
        }
    }
    labels
}
