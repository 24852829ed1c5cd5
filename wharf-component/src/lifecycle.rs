//! Drives the `NEW -> INITIALIZED -> STARTED -> STOPPED` transitions
//! (`spec.md` §4.3/§5). These functions are the *only* place a component's
//! state is mutated or its `impl_*` hooks are invoked — user code never
//! calls them directly, matching "Transitions are driven by the framework
//! (never by user code)".

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::component::{Component, ComponentState};
use crate::context::ControlContext;
use wharf_core::{Result, WharfError};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Register `component` as a named child of `parent_ctx` and run its
/// `impl_init`, transitioning it `NEW -> INITIALIZED`. Composite components
/// (managers, the Warehouse) call this once per config entry while building
/// their own `children()` list.
pub async fn init_child(
    parent_ctx: &Arc<ControlContext>,
    explicit_name: Option<&str>,
    component: Arc<dyn Component>,
) -> Result<Arc<dyn Component>> {
    let stem = component.class_stem();
    let ctx = parent_ctx.add_child(stem, explicit_name, component.clone())?;
    component.base().set_context(ctx.clone());
    component.impl_init(&ctx).await?;
    component.base().set_state(ComponentState::Initialized);
    Ok(component)
}

/// Initialize the root component directly against a freshly created root
/// context (it has no parent to register under).
pub async fn init_root(root_ctx: &Arc<ControlContext>, component: Arc<dyn Component>) -> Result<()> {
    component.base().set_context(root_ctx.clone());
    component.impl_init(root_ctx).await?;
    component.base().set_state(ComponentState::Initialized);
    Ok(())
}

/// `start(isReload)`: children start concurrently, then `impl_start` runs as
/// the parent's own post-action, matching "children started before parent's
/// `_impl_start` returns... default is concurrent children then parent
/// post-action". `fails with AlreadyStarted` if already `STARTED`.
pub fn start_tree<'a>(component: &'a Arc<dyn Component>, is_reload: bool) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        if component.state() == ComponentState::Started {
            return Err(WharfError::AlreadyStarted(component.context().dotted_name()));
        }

        let children = component.children();
        let mut handles = Vec::with_capacity(children.len());
        for child in children {
            handles.push(tokio::spawn(async move { start_tree(&child, is_reload).await }));
        }
        for handle in handles {
            handle
                .await
                .map_err(|e| WharfError::Internal(format!("child start task panicked: {e}")))??;
        }

        component.impl_start(is_reload).await?;
        component.base().set_state(ComponentState::Started);
        Ok(())
    })
}

/// `stop(willReload)`: the component's own `impl_stop` (its "stop accepting
/// new work" action) runs first, then children stop concurrently — the
/// reverse of `start`'s discipline. Per spec's stop error policy, a child's
/// stop failure is logged and does not prevent the others from stopping.
pub fn stop_tree<'a>(component: &'a Arc<dyn Component>, will_reload: bool) -> BoxFuture<'a, Result<()>> {
    Box::pin(async move {
        let impl_stop_result = component.impl_stop(will_reload).await;
        if let Err(e) = &impl_stop_result {
            tracing::warn!(
                component = %component.context().dotted_name(),
                error = %e,
                "component stop hook failed; continuing shutdown"
            );
        }

        let children = component.children();
        let mut handles = Vec::with_capacity(children.len());
        for child in children {
            handles.push(tokio::spawn(async move { stop_tree(&child, will_reload).await }));
        }
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "child stop failed; continuing"),
                Err(e) => tracing::warn!(error = %e, "child stop task panicked; continuing"),
            }
        }

        component.base().set_state(ComponentState::Stopped);
        impl_stop_result
    })
}

/// Convenience used by `wharf-store`'s Warehouse: initialize and start the
/// root component in one call.
pub async fn init_and_start_root(
    root_ctx: &Arc<ControlContext>,
    component: Arc<dyn Component>,
    is_reload: bool,
) -> Result<()> {
    init_root(root_ctx, component.clone()).await?;
    start_tree(&component, is_reload).await
}

pub async fn init_tree(
    root_ctx: &Arc<ControlContext>,
    component: Arc<dyn Component>,
) -> Result<()> {
    init_root(root_ctx, component).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentBase;
    use crate::logger::NoopLogger;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::RwLock;

    struct Recorder {
        base: ComponentBase,
        log: Arc<Mutex<Vec<String>>>,
        name: &'static str,
        children: RwLock<Vec<Arc<dyn Component>>>,
    }

    #[async_trait]
    impl Component for Recorder {
        fn class_stem(&self) -> &'static str {
            "node"
        }
        fn base(&self) -> &ComponentBase {
            &self.base
        }
        fn children(&self) -> Vec<Arc<dyn Component>> {
            self.children.try_read().map(|c| c.clone()).unwrap_or_default()
        }
        async fn impl_init(&self, _ctx: &Arc<ControlContext>) -> Result<()> {
            self.log.lock().unwrap().push(format!("init:{}", self.name));
            Ok(())
        }
        async fn impl_start(&self, _is_reload: bool) -> Result<()> {
            self.log.lock().unwrap().push(format!("start:{}", self.name));
            Ok(())
        }
        async fn impl_stop(&self, _will_reload: bool) -> Result<()> {
            self.log.lock().unwrap().push(format!("stop:{}", self.name));
            Ok(())
        }
    }

    fn recorder(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<Recorder> {
        Arc::new(Recorder { base: ComponentBase::new(), log, name, children: RwLock::new(Vec::new()) })
    }

    #[tokio::test]
    async fn children_init_and_start_before_parent_start_returns() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let root_ctx = ControlContext::root(Arc::new(NoopLogger));
        let parent = recorder("parent", log.clone());
        let child = recorder("child", log.clone());

        init_root(&root_ctx, parent.clone() as Arc<dyn Component>).await.unwrap();
        let child_component: Arc<dyn Component> = init_child(&parent.context(), Some("child"), child.clone()).await.unwrap();
        *parent.children.write().await = vec![child_component];

        let parent_dyn: Arc<dyn Component> = parent.clone();
        start_tree(&parent_dyn, false).await.unwrap();

        let entries = log.lock().unwrap().clone();
        assert_eq!(entries, vec!["init:parent", "init:child", "start:child", "start:parent"]);
    }

    #[tokio::test]
    async fn starting_twice_fails_with_already_started() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let root_ctx = ControlContext::root(Arc::new(NoopLogger));
        let parent = recorder("parent", log);
        init_root(&root_ctx, parent.clone() as Arc<dyn Component>).await.unwrap();
        let parent_dyn: Arc<dyn Component> = parent.clone();
        start_tree(&parent_dyn, false).await.unwrap();
        let err = start_tree(&parent_dyn, false).await.unwrap_err();
        assert!(matches!(err, WharfError::AlreadyStarted(_)));
    }

    #[tokio::test]
    async fn stop_runs_parent_impl_stop_before_children() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let root_ctx = ControlContext::root(Arc::new(NoopLogger));
        let parent = recorder("parent", log.clone());
        let child = recorder("child", log.clone());
        init_root(&root_ctx, parent.clone() as Arc<dyn Component>).await.unwrap();
        let child_component = init_child(&parent.context(), Some("child"), child.clone() as Arc<dyn Component>).await.unwrap();
        *parent.children.write().await = vec![child_component];

        let parent_dyn: Arc<dyn Component> = parent.clone();
        start_tree(&parent_dyn, false).await.unwrap();
        log.lock().unwrap().clear();

        stop_tree(&parent_dyn, false).await.unwrap();
        let entries = log.lock().unwrap().clone();
        assert_eq!(entries[0], "stop:parent");
        assert!(entries.contains(&"stop:child".to_string()));
    }

    #[tokio::test]
    async fn stop_continues_past_a_failing_child() {
        struct Failing(ComponentBase);
        #[async_trait]
        impl Component for Failing {
            fn class_stem(&self) -> &'static str {
                "failing"
            }
            fn base(&self) -> &ComponentBase {
                &self.0
            }
            async fn impl_stop(&self, _will_reload: bool) -> Result<()> {
                Err(WharfError::Internal("boom".into()))
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let root_ctx = ControlContext::root(Arc::new(NoopLogger));
        let parent = recorder("parent", log.clone());
        init_root(&root_ctx, parent.clone() as Arc<dyn Component>).await.unwrap();

        let failing: Arc<dyn Component> = Arc::new(Failing(ComponentBase::new()));
        let failing = init_child(&parent.context(), Some("failing"), failing).await.unwrap();
        let sibling = recorder("sibling", log.clone());
        let sibling_component = init_child(&parent.context(), Some("sibling"), sibling.clone() as Arc<dyn Component>).await.unwrap();
        *parent.children.write().await = vec![failing, sibling_component];
        let _ = calls;

        let parent_dyn: Arc<dyn Component> = parent.clone();
        // stop_tree must still report the parent's own impl_stop result and
        // must still have stopped the sibling despite the failing child.
        stop_tree(&parent_dyn, false).await.unwrap();
        assert!(log.lock().unwrap().contains(&"stop:sibling".to_string()));
    }
}
