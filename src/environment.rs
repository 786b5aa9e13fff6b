use crate::value::Value;
use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};

/// Frames registered before an automatic cycle collection runs.
const MIN_COLLECT_THRESHOLD: usize = 1024;

/// Handle to one frame of the lexical scope chain.
///
/// Clones share the frame: a closure holding a clone sees every binding made
/// in it later. A frame that holds a closure over itself forms a reference
/// cycle; [`Environment::collect_cycles`] reclaims such frames once nothing
/// outside the cycle can reach them.
#[derive(Clone)]
pub struct Environment {
    ptr: Rc<RefCell<Frame>>,
}

/// Non-owning handle, for checking whether a frame is still alive.
#[derive(Clone)]
pub struct WeakEnvironment {
    ptr: Weak<RefCell<Frame>>,
}

#[derive(Default)]
struct Frame {
    store: HashMap<String, Value>,
    outer: Option<Environment>,
}

/// Every frame created on this thread, for the cycle collector.
struct FrameRegistry {
    frames: Vec<Weak<RefCell<Frame>>>,
    threshold: usize,
}

thread_local! {
    static REGISTRY: RefCell<FrameRegistry> = RefCell::new(FrameRegistry {
        frames: Vec::new(),
        threshold: MIN_COLLECT_THRESHOLD,
    });
}

impl Environment {
    pub fn new() -> Self {
        Self::allocate(Frame::default())
    }

    /// A fresh frame whose lookups fall back to `self`.
    pub fn enclosed(&self) -> Self {
        tracing::trace!("new enclosed environment");
        Self::allocate(Frame {
            store: HashMap::new(),
            outer: Some(self.clone()),
        })
    }

    fn allocate(frame: Frame) -> Self {
        let due = REGISTRY.with(|registry| {
            let registry = registry.borrow();
            registry.frames.len() >= registry.threshold
        });
        if due {
            Self::collect_cycles();
        }

        let ptr = Rc::new(RefCell::new(frame));
        REGISTRY.with(|registry| registry.borrow_mut().frames.push(Rc::downgrade(&ptr)));
        Self { ptr }
    }

    /// Look `name` up in this frame, then outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut current = Some(self.clone());
        while let Some(env) = current {
            let frame = env.ptr.borrow();
            if let Some(value) = frame.store.get(name) {
                return Some(value.clone());
            }
            current = frame.outer.clone();
        }
        None
    }

    /// Bind `name` in this frame, shadowing or overwriting; outer frames are
    /// never written.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.ptr.borrow_mut().store.insert(name.into(), value);
    }

    pub fn outer(&self) -> Option<Environment> {
        self.ptr.borrow().outer.clone()
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.ptr, &other.ptr)
    }

    pub fn downgrade(&self) -> WeakEnvironment {
        WeakEnvironment {
            ptr: Rc::downgrade(&self.ptr),
        }
    }

    /// Free every frame of this thread that is only kept alive by reference
    /// cycles, and return how many were freed.
    ///
    /// Frames, closures, arrays and hashes form the object graph. An object
    /// is externally held when its strong count exceeds the references the
    /// graph itself accounts for; everything reachable from an externally
    /// held object survives. Unreachable frames have their bindings and
    /// outer link cleared, which lets plain reference counting drop them.
    pub fn collect_cycles() -> usize {
        let frames: Vec<Rc<RefCell<Frame>>> = REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            registry.frames.retain(|frame| frame.strong_count() > 0);
            registry.frames.iter().filter_map(Weak::upgrade).collect()
        });

        let garbage = {
            let mut borrowed = Vec::with_capacity(frames.len());
            for frame in &frames {
                match frame.try_borrow() {
                    Ok(frame) => borrowed.push(frame),
                    // a binding is being written; try again at the next chance
                    Err(_) => return 0,
                }
            }
            ObjectGraph::build(&frames, &borrowed).unreachable_frames()
        };

        for &index in &garbage {
            let (store, outer) = {
                let mut frame = frames[index].borrow_mut();
                (std::mem::take(&mut frame.store), frame.outer.take())
            };
            drop(store);
            drop(outer);
        }
        drop(frames);

        REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            registry.frames.retain(|frame| frame.strong_count() > 0);
            registry.threshold = (registry.frames.len() * 2).max(MIN_COLLECT_THRESHOLD);
        });

        if !garbage.is_empty() {
            tracing::debug!(frames = garbage.len(), "collected unreachable frames");
        }
        garbage.len()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl WeakEnvironment {
    pub fn upgrade(&self) -> Option<Environment> {
        self.ptr.upgrade().map(|ptr| Environment { ptr })
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let frame = self.ptr.borrow();
        let mut names: Vec<&String> = frame.store.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_outer", &frame.outer.is_some())
            .finish()
    }
}

struct Node {
    strong: usize,
    internal: usize,
    edges: Vec<usize>,
    frame: Option<usize>,
}

/// Snapshot of the heap objects reachable from the registered frames,
/// keyed by allocation address.
struct ObjectGraph {
    nodes: HashMap<usize, Node>,
}

fn address<T: ?Sized>(rc: &Rc<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

impl ObjectGraph {
    fn build(frames: &[Rc<RefCell<Frame>>], borrowed: &[Ref<'_, Frame>]) -> Self {
        let mut graph = ObjectGraph {
            nodes: HashMap::new(),
        };

        for (index, (rc, frame)) in frames.iter().zip(borrowed).enumerate() {
            let id = address(rc);
            let mut edges = Vec::new();
            if let Some(outer) = &frame.outer {
                edges.push(address(&outer.ptr));
            }
            for value in frame.store.values() {
                graph.visit(value, &mut edges);
            }
            graph.nodes.insert(
                id,
                Node {
                    // less the handle held in `frames`
                    strong: Rc::strong_count(rc) - 1,
                    internal: 0,
                    edges,
                    frame: Some(index),
                },
            );
        }

        let targets: Vec<usize> = graph
            .nodes
            .values()
            .flat_map(|node| node.edges.iter().copied())
            .collect();
        for target in targets {
            if let Some(node) = graph.nodes.get_mut(&target) {
                node.internal += 1;
            }
        }
        graph
    }

    /// Record the edge from the current object to `value`'s allocation,
    /// adding that allocation as a node the first time it is seen.
    fn visit(&mut self, value: &Value, edges: &mut Vec<usize>) {
        let mut pending = vec![value];
        let mut first = true;
        while let Some(value) = pending.pop() {
            let (id, strong) = match value {
                Value::Array(elements) => (address(elements), Rc::strong_count(elements)),
                Value::Hash(pairs) => (address(pairs), Rc::strong_count(pairs)),
                Value::Function(function) => (address(function), Rc::strong_count(function)),
                _ => continue,
            };
            if first {
                edges.push(id);
            }
            first = false;
            if self.nodes.contains_key(&id) {
                continue;
            }

            let mut children = Vec::new();
            match value {
                Value::Array(elements) => {
                    for element in elements.iter() {
                        Self::push_child(element, &mut children, &mut pending);
                    }
                }
                Value::Hash(pairs) => {
                    for pair in pairs.values() {
                        Self::push_child(&pair.key, &mut children, &mut pending);
                        Self::push_child(&pair.value, &mut children, &mut pending);
                    }
                }
                Value::Function(function) => children.push(address(&function.env.ptr)),
                _ => {}
            }
            self.nodes.insert(
                id,
                Node {
                    strong,
                    internal: 0,
                    edges: children,
                    frame: None,
                },
            );
        }
    }

    fn push_child<'v>(value: &'v Value, children: &mut Vec<usize>, pending: &mut Vec<&'v Value>) {
        let id = match value {
            Value::Array(elements) => address(elements),
            Value::Hash(pairs) => address(pairs),
            Value::Function(function) => address(function),
            _ => return,
        };
        children.push(id);
        pending.push(value);
    }

    fn unreachable_frames(&self) -> Vec<usize> {
        let mut reachable: Vec<usize> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.strong > node.internal)
            .map(|(&id, _)| id)
            .collect();
        let mut marked: HashSet<usize> = reachable.iter().copied().collect();

        while let Some(id) = reachable.pop() {
            if let Some(node) = self.nodes.get(&id) {
                for &edge in &node.edges {
                    if marked.insert(edge) {
                        reachable.push(edge);
                    }
                }
            }
        }

        self.nodes
            .iter()
            .filter(|(id, _)| !marked.contains(id))
            .filter_map(|(_, node)| node.frame)
            .collect()
    }
}
