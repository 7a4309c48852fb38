use crate::value::Value;

/// Pre-order walk over the values below a container, yielding those that
/// match a predicate.
///
/// Children are read when their container is visited, so mutations made
/// while iterating are seen by containers not yet entered.
pub struct Find<P> {
    stack: Vec<Value>,
    predicate: P,
}

impl<P> Find<P>
where
    P: FnMut(&Value) -> bool,
{
    pub(crate) fn new(mut roots: Vec<Value>, predicate: P) -> Self {
        roots.reverse();
        Self {
            stack: roots,
            predicate,
        }
    }
}

impl<P> Iterator for Find<P>
where
    P: FnMut(&Value) -> bool,
{
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        while let Some(value) = self.stack.pop() {
            if let Some(container) = value.as_container() {
                self.stack.extend(container.values().into_iter().rev());
            }
            if (self.predicate)(&value) {
                return Some(value);
            }
        }
        None
    }
}
