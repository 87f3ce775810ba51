//! Common test utilities and helpers
//!
//! Scripted child sources for driving the tree model without a database.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use arbordb::error::DbError;
use arbordb::tree::{ChildSource, Label, NodeSpec};

/// A child source backed by a closure, with a shared invocation counter
pub struct ScriptedSource {
    calls: Rc<Cell<usize>>,
    #[allow(clippy::type_complexity)]
    f: Box<dyn Fn(bool) -> Result<Vec<NodeSpec>, DbError>>,
}

impl ChildSource for ScriptedSource {
    fn fetch(&self, indexing: bool) -> Result<Vec<NodeSpec>, DbError> {
        self.calls.set(self.calls.get() + 1);
        (self.f)(indexing)
    }
}

/// Build a scripted source and its call counter
pub fn scripted(
    f: impl Fn(bool) -> Result<Vec<NodeSpec>, DbError> + 'static,
) -> (Box<ScriptedSource>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    (
        Box::new(ScriptedSource {
            calls: calls.clone(),
            f: Box::new(f),
        }),
        calls,
    )
}

/// A plain branch with no source
pub fn branch(label: &str) -> NodeSpec {
    NodeSpec::branch(Label::plain(label))
}

/// A branch whose source always yields plain branches named `children`
pub fn branch_with(label: &str, children: &[&str]) -> NodeSpec {
    let names: Vec<String> = children.iter().map(|s| s.to_string()).collect();
    let (src, _) = scripted(move |_| Ok(names.iter().map(|n| branch(n)).collect()));
    branch(label).with_source(src)
}

/// A source that serves each batch in turn, repeating the last one
pub fn batches(batches: Vec<Vec<&'static str>>) -> Box<ScriptedSource> {
    let stored: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(
        batches
            .into_iter()
            .map(|b| b.into_iter().map(str::to_string).collect())
            .collect(),
    ));
    let served = Rc::new(Cell::new(0usize));
    let (src, _) = scripted(move |_| {
        let all = stored.borrow();
        let idx = served.get().min(all.len().saturating_sub(1));
        served.set(served.get() + 1);
        Ok(all[idx].iter().map(|n| branch(n)).collect())
    });
    src
}
