//! Installation of the protected system variables.

use super::cache::EventSnapshotCache;
use super::error::BindingError;
use super::namespace::{Namespace, ProtectedAccessor};
use super::predicate::InPredicate;
use super::variable::{SystemValue, SystemVariable};
use crate::core::ContextProvider;
use std::rc::Rc;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// Installs `_name`, `_sessionid`, `_ioprocessors`, `_event`, `_x` and `In`
/// into a script namespace.
///
/// Each variable delegates to the provider at read time and rejects writes.
/// `_event` resolves through an [`EventSnapshotCache`] owned by the
/// installed accessors, so each namespace keeps its own identity-stable
/// snapshot.
pub struct SystemContextBinding;

impl SystemContextBinding {
    /// Install every protected variable into `namespace`.
    ///
    /// Installation is all-or-nothing: every name is checked first and, if
    /// any is already bound, nothing is installed.
    ///
    /// # Errors
    ///
    /// [`BindingError::DuplicateBinding`] listing every name that is
    /// already bound, including the case of a second install on the same
    /// namespace.
    pub fn install<N>(namespace: &mut N, provider: Rc<dyn ContextProvider>) -> Result<(), BindingError>
    where
        N: Namespace + ?Sized,
    {
        if let Validation::Failure(names) = check_unbound(namespace) {
            let names: Vec<String> = names.iter().cloned().collect();
            tracing::error!(?names, "system variables already bound, refusing to install");
            return Err(BindingError::DuplicateBinding { names });
        }

        for accessor in Self::accessors(provider) {
            let name = accessor.name();
            namespace.define_protected(accessor)?;
            tracing::debug!(variable = name, "installed protected system variable");
        }
        Ok(())
    }

    /// The six accessors, sharing one snapshot cache and one `In` predicate.
    pub fn accessors(provider: Rc<dyn ContextProvider>) -> Vec<ProtectedAccessor> {
        let cache = Rc::new(EventSnapshotCache::new());
        let predicate = InPredicate::new(Rc::clone(&provider));

        SystemVariable::ALL
            .into_iter()
            .map(|variable| {
                let provider = Rc::clone(&provider);
                match variable {
                    SystemVariable::Name => ProtectedAccessor::new(variable, move || {
                        provider.name().map_or(SystemValue::Absent, SystemValue::Text)
                    }),
                    SystemVariable::SessionId => ProtectedAccessor::new(variable, move || {
                        SystemValue::Text(provider.session_id())
                    }),
                    SystemVariable::IoProcessors => ProtectedAccessor::new(variable, move || {
                        SystemValue::IoProcessors(provider.io_processors())
                    }),
                    SystemVariable::Event => {
                        let cache = Rc::clone(&cache);
                        ProtectedAccessor::new(variable, move || {
                            cache
                                .resolve(provider.event())
                                .map_or(SystemValue::Absent, SystemValue::Event)
                        })
                    }
                    SystemVariable::X => ProtectedAccessor::new(variable, move || {
                        SystemValue::Data(serde_json::Value::Object(provider.extended_state()))
                    }),
                    SystemVariable::In => {
                        let predicate = predicate.clone();
                        ProtectedAccessor::new(variable, move || {
                            SystemValue::Predicate(predicate.clone())
                        })
                    }
                }
            })
            .collect()
    }
}

/// Check every protected name, accumulating all that are already bound.
fn check_unbound<N>(namespace: &N) -> Validation<(), NonEmptyVec<String>>
where
    N: Namespace + ?Sized,
{
    let checks: Vec<Validation<(), NonEmptyVec<String>>> = SystemVariable::ALL
        .iter()
        .map(|variable| {
            if namespace.is_bound(variable.as_str()) {
                Validation::fail(variable.as_str().to_string())
            } else {
                Validation::success(())
            }
        })
        .collect();

    Validation::all_vec(checks).map(|_| ())
}
