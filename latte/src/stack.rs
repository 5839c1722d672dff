use std::fmt;
use std::rc::Rc;

struct Node<T> {
    value: T,
    next: Stack<T>,
}

/// Immutable linked stack whose tails are shared between handles.
///
/// Pushing allocates one node pointing at the existing stack, popping hands
/// back that tail. Nodes are never mutated after construction, so any number
/// of stacks can branch off a common suffix and each branch pays O(1) to grow
/// or shrink.
pub struct Stack<T> {
    head: Option<Rc<Node<T>>>,
}

impl<T> Stack<T> {
    /// The empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self { head: None }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// A new stack with `value` on top of `self`. `self` is unchanged.
    #[must_use]
    pub fn push(&self, value: T) -> Self {
        Self {
            head: Some(Rc::new(Node {
                value,
                next: self.clone(),
            })),
        }
    }

    /// The tail of this stack, or `None` for the empty stack.
    #[must_use]
    pub fn pop(&self) -> Option<Self> {
        self.head.as_ref().map(|node| node.next.clone())
    }

    #[inline]
    #[must_use]
    pub fn top(&self) -> Option<&T> {
        self.head.as_ref().map(|node| &node.value)
    }

    /// Elements from the top down.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Walks the whole stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// `true` if both handles point at the same node (or are both empty).
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Clone for Stack<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
        }
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Unlinks uniquely owned nodes one at a time so long stacks don't recurse
// on drop.
impl<T> Drop for Stack<T> {
    fn drop(&mut self) {
        let mut head = self.head.take();
        while let Some(node) = head {
            match Rc::try_unwrap(node) {
                Ok(mut node) => head = node.next.head.take(),
                Err(_) => break,
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.next.head.as_deref();
        Some(&node.value)
    }
}

impl<'a, T> IntoIterator for &'a Stack<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
