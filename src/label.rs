use crate::word::Word;

/// Index of a node in a [`Labels`] trie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(u32);

impl LabelId {
  /// The empty name, and the scope of every top-level label
  pub const ROOT: Self = Self(0);
}

#[derive(Debug, Clone, Default)]
struct Node {
  addr: Option<Word>,
  // 0 means absent: the root is never anyone's child
  children: [u32; 16],
}

/// The label table: a 16-way trie over the nibbles of each name byte.
///
/// Every byte is walked as its high nibble then its low nibble, so lookups
/// cost O(name length) with no hashing and names are arbitrary bytes (UTF-8
/// included). Nodes live in one growable arena and refer to each other by
/// index.
///
/// A sub-label such as `.loop` is inserted starting from its scope's node
/// instead of the root. Since the scope's node *is* the path of its name,
/// `.loop` under `main` lands on exactly the node of `main.loop`.
#[derive(Debug, Clone)]
pub struct Labels {
  nodes: Vec<Node>,
}

impl Labels {
  pub fn new() -> Self {
    Self {
      nodes: vec![Node::default()],
    }
  }

  /// Insert-or-find `name`, scoped under `scope` if it starts with `.`.
  pub fn add(&mut self, scope: LabelId, name: &[u8]) -> LabelId {
    let mut id = if name.first() == Some(&b'.') {
      scope
    } else {
      LabelId::ROOT
    };
    for &byte in name {
      id = self.child_or_insert(id, byte >> 4);
      id = self.child_or_insert(id, byte & 0xF);
    }
    id
  }

  /// The address bound to `id`, if it has been declared
  pub fn resolve(&self, id: LabelId) -> Option<Word> {
    self.nodes[id.0 as usize].addr
  }

  /// Bind `id` to `addr`. A label is bound at most once; a second declaration
  /// returns the address it already holds.
  pub fn declare(&mut self, id: LabelId, addr: Word) -> Result<(), Word> {
    let node = &mut self.nodes[id.0 as usize];
    match node.addr {
      Some(prev) => Err(prev),
      None => {
        node.addr = Some(addr);
        Ok(())
      }
    }
  }

  /// Look up a fully qualified name, such as `main.loop`.
  pub fn find(&self, name: &str) -> Option<Word> {
    let mut id = LabelId::ROOT;
    for &byte in name.as_bytes() {
      id = self.child(id, byte >> 4)?;
      id = self.child(id, byte & 0xF)?;
    }
    self.resolve(id)
  }

  /// Number of trie nodes, including the root
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.len() == 1
  }

  fn child(&self, id: LabelId, nibble: u8) -> Option<LabelId> {
    match self.nodes[id.0 as usize].children[nibble as usize] {
      0 => None,
      child => Some(LabelId(child)),
    }
  }

  fn child_or_insert(&mut self, id: LabelId, nibble: u8) -> LabelId {
    if let Some(child) = self.child(id, nibble) {
      return child;
    }
    let child = self.nodes.len() as u32;
    self.nodes.push(Node::default());
    self.nodes[id.0 as usize].children[nibble as usize] = child;
    LabelId(child)
  }
}

impl Default for Labels {
  fn default() -> Self {
    Self::new()
  }
}
