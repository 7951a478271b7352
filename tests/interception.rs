//! End-to-end interception of environment calls made through linked call sites

use inputwatch::{
    CacheableCallSite, CallError, CallFlags, CallSite, CallSiteFactory, CallSiteLinker,
    DynamicLinker, InputRecorder, InterceptorRegistry, LinkRequest, ObjectRef, ObservedInput,
    PropertyMap, PropertyStore, RecordingEnvironment, Signature, SystemFacade, Value, ValueType,
};
use std::sync::{Arc, Mutex};

/// Recorder that logs calls and answers reads with a fixed value.
#[derive(Default)]
struct ScriptedRecorder {
    reads: Mutex<Vec<(String, Option<String>, String)>>,
    writes: Mutex<Vec<(Option<PropertyMap>, String)>>,
}

impl InputRecorder for ScriptedRecorder {
    fn system_property(
        &self,
        key: &str,
        default: Option<&str>,
        consumer: &str,
    ) -> Result<Value, CallError> {
        self.reads.lock().unwrap().push((
            key.to_string(),
            default.map(str::to_string),
            consumer.to_string(),
        ));
        Ok(Value::from("recorded"))
    }

    fn set_system_properties(
        &self,
        properties: Option<&PropertyMap>,
        consumer: &str,
    ) -> Result<(), CallError> {
        self.writes
            .lock()
            .unwrap()
            .push((properties.cloned(), consumer.to_string()));
        Ok(())
    }
}

struct Fixture {
    store: Arc<PropertyStore>,
    system: ObjectRef,
    recorder: Arc<ScriptedRecorder>,
    linker: CallSiteLinker,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(PropertyStore::new([("os.name", "Linux")]));
        let system = SystemFacade::object(store.clone());
        let recorder = Arc::new(ScriptedRecorder::default());
        let registry = InterceptorRegistry::standard(system.clone(), recorder.clone())
            .expect("standard registry");
        let linker = CallSiteLinker::new(Arc::new(registry), Arc::new(DynamicLinker::new()));
        Self {
            store,
            system,
            recorder,
            linker,
        }
    }

    fn site(&self, caller: &str, name: &str, arity: usize, flags: CallFlags) -> Arc<dyn CallSite> {
        let request =
            LinkRequest::method(caller, name, Signature::generic(arity)).with_flags(flags);
        self.linker.bootstrap(&request).expect("link")
    }

    fn system(&self) -> Value {
        Value::Object(self.system.clone())
    }

    fn read_count(&self) -> usize {
        self.recorder.reads.lock().unwrap().len()
    }
}

#[test]
fn single_key_read_is_recorded() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "getProperty", 2, CallFlags::empty());

    let result = site.invoke(&[fx.system(), Value::from("os.name")]);

    assert_eq!(result, Ok(Value::from("recorded")));
    assert_eq!(
        *fx.recorder.reads.lock().unwrap(),
        vec![("os.name".to_string(), None, "build_gradle".to_string())]
    );
}

#[test]
fn key_with_default_read_is_recorded() {
    let fx = Fixture::new();
    let site = fx.site("settings_gradle", "getProperty", 3, CallFlags::empty());

    site.invoke(&[fx.system(), Value::from("java.home"), Value::from("/opt")])
        .unwrap();

    assert_eq!(
        *fx.recorder.reads.lock().unwrap(),
        vec![(
            "java.home".to_string(),
            Some("/opt".to_string()),
            "settings_gradle".to_string()
        )]
    );
}

#[test]
fn unrelated_receiver_calls_original() {
    let fx = Fixture::new();
    let other_store = Arc::new(PropertyStore::new([("os.name", "Plan9")]));
    let other = Value::Object(SystemFacade::object(other_store));
    let site = fx.site("build_gradle", "getProperty", 2, CallFlags::empty());

    let result = site.invoke(&[other, Value::from("os.name")]);

    assert_eq!(result, Ok(Value::from("Plan9")));
    assert_eq!(fx.read_count(), 0);
}

#[test]
fn unknown_overload_on_facade_calls_original() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "getProperty", 4, CallFlags::empty());

    let result = site.invoke(&[
        fx.system(),
        Value::from("a"),
        Value::from("b"),
        Value::from("c"),
    ]);

    assert!(matches!(result, Err(CallError::MissingMethod { arity: 3, .. })));
    assert_eq!(fx.read_count(), 0);
}

#[test]
fn original_errors_propagate_through_fallback() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "getProperty", 2, CallFlags::empty());

    let result = site.invoke(&[fx.system(), Value::Null]);

    assert_eq!(
        result,
        Err(CallError::NullPointer("key can't be null".to_string()))
    );
    assert_eq!(fx.read_count(), 0);
}

#[test]
fn null_receiver_behaves_like_undecorated_site() {
    let fx = Fixture::new();
    let undecorated = DynamicLinker::new();

    for flags in [CallFlags::empty(), CallFlags::SAFE_NAVIGATION] {
        let request = LinkRequest::method("build_gradle", "getProperty", Signature::generic(2))
            .with_flags(flags);
        let plain = undecorated.bootstrap(&request).unwrap();
        let decorated = fx.site("build_gradle", "getProperty", 2, flags);
        let args = [Value::Null, Value::from("os.name")];
        assert_eq!(decorated.invoke(&args), plain.invoke(&args));
    }
    assert_eq!(fx.read_count(), 0);
}

#[test]
fn wrapped_arguments_are_unwrapped_before_recording() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "getProperty", 2, CallFlags::empty());

    site.invoke(&[fx.system(), Value::wrapped("user.home", ValueType::Object)])
        .unwrap();

    assert_eq!(fx.recorder.reads.lock().unwrap()[0].0, "user.home");
}

#[test]
fn spread_call_read_is_recorded() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "getProperty", 2, CallFlags::SPREAD_CALL);

    let packed = Value::Array(vec![Value::from("os.arch"), Value::from("x86")]);
    let result = site.invoke(&[fx.system(), packed]);

    assert_eq!(result, Ok(Value::from("recorded")));
    assert_eq!(
        *fx.recorder.reads.lock().unwrap(),
        vec![(
            "os.arch".to_string(),
            Some("x86".to_string()),
            "build_gradle".to_string()
        )]
    );
}

#[test]
fn bulk_write_is_recorded_and_returns_null() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "setProperties", 2, CallFlags::empty());
    let mut props = PropertyMap::new();
    props.insert("org.gradle.debug".into(), Value::from("true"));

    let result = site.invoke(&[fx.system(), Value::Map(props.clone())]);

    assert_eq!(result, Ok(Value::Null));
    assert_eq!(
        *fx.recorder.writes.lock().unwrap(),
        vec![(Some(props), "build_gradle".to_string())]
    );
    // The scripted recorder does not write through.
    assert_eq!(fx.store.get("os.name").as_deref(), Some("Linux"));
}

#[test]
fn bulk_write_of_null_is_a_reset() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "setProperties", 2, CallFlags::empty());

    site.invoke(&[fx.system(), Value::Null]).unwrap();

    assert_eq!(
        *fx.recorder.writes.lock().unwrap(),
        vec![(None, "build_gradle".to_string())]
    );
}

#[test]
fn bulk_write_with_unexpected_argument_calls_original() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "setProperties", 2, CallFlags::empty());

    let result = site.invoke(&[fx.system(), Value::from("not a map")]);

    assert!(matches!(result, Err(CallError::MissingMethod { .. })));
    assert!(fx.recorder.writes.lock().unwrap().is_empty());
}

#[test]
fn unregistered_method_on_facade_is_not_recorded() {
    let fx = Fixture::new();
    let site = fx.site("build_gradle", "setProperty", 3, CallFlags::empty());

    let result = site.invoke(&[fx.system(), Value::from("k"), Value::from("v")]);

    assert_eq!(result, Ok(Value::Null));
    assert_eq!(fx.store.get("k").as_deref(), Some("v"));
    assert_eq!(fx.read_count(), 0);
}

#[test]
fn fallback_target_is_decorated_too() {
    let store = Arc::new(PropertyStore::new([("os.name", "Linux")]));
    let system = SystemFacade::object(store);
    let recorder = Arc::new(ScriptedRecorder::default());
    let registry = InterceptorRegistry::standard(system.clone(), recorder.clone()).unwrap();
    let linker = CallSiteLinker::new(Arc::new(registry), Arc::new(DynamicLinker::new()));
    let request = LinkRequest::method("build_gradle", "getProperty", Signature::generic(2));

    let site = linker.bootstrap(&request).unwrap();
    let cacheable = site.as_cacheable().unwrap();
    cacheable.set_target(cacheable.fallback_target()).unwrap();

    site.invoke(&[Value::Object(system), Value::from("os.name")])
        .unwrap();
    assert_eq!(recorder.reads.lock().unwrap().len(), 1);
}

#[test]
fn recording_environment_end_to_end() {
    let store = Arc::new(PropertyStore::new([("os.name", "Linux")]));
    let system = SystemFacade::object(store.clone());
    let recorder = Arc::new(RecordingEnvironment::new(store.clone()));
    let registry = InterceptorRegistry::standard(system.clone(), recorder.clone()).unwrap();
    let linker = CallSiteLinker::new(Arc::new(registry), Arc::new(DynamicLinker::new()));

    let read = linker
        .bootstrap(&LinkRequest::method("Script1", "getProperty", Signature::generic(2)))
        .unwrap();
    let write = linker
        .bootstrap(&LinkRequest::method("Script1", "setProperties", Signature::generic(2)))
        .unwrap();

    assert_eq!(
        read.invoke(&[Value::Object(system.clone()), Value::from("os.name")]),
        Ok(Value::from("Linux"))
    );

    let mut props = PropertyMap::new();
    props.insert("os.name".into(), Value::from("Haiku"));
    write
        .invoke(&[Value::Object(system.clone()), Value::Map(props.clone())])
        .unwrap();

    assert_eq!(
        read.invoke(&[Value::Object(system), Value::from("os.name")]),
        Ok(Value::from("Haiku"))
    );
    assert_eq!(
        recorder.observed(),
        vec![
            ObservedInput::SystemProperty {
                key: "os.name".into(),
                value: Some("Linux".into()),
                consumer: "Script1".into(),
            },
            ObservedInput::SystemPropertiesReplaced {
                properties: Some(props),
                consumer: "Script1".into(),
            },
            ObservedInput::SystemProperty {
                key: "os.name".into(),
                value: Some("Haiku".into()),
                consumer: "Script1".into(),
            },
        ]
    );
}

/// Linker over a [`RecordingEnvironment`] next to an undecorated linker, for
/// checking that decorated sites behave like plain ones.
fn recording_and_plain_sites(
    name: &str,
) -> (Value, Arc<RecordingEnvironment>, Arc<dyn CallSite>, Arc<dyn CallSite>) {
    let store = Arc::new(PropertyStore::new([("os.name", "Linux")]));
    let system = SystemFacade::object(store.clone());
    let recorder = Arc::new(RecordingEnvironment::new(store));
    let registry = InterceptorRegistry::standard(system.clone(), recorder.clone()).unwrap();
    let linker = CallSiteLinker::new(Arc::new(registry), Arc::new(DynamicLinker::new()));
    let request = LinkRequest::method("Script1", name, Signature::generic(2));

    let decorated = linker.bootstrap(&request).unwrap();
    let plain = DynamicLinker::new().bootstrap(&request).unwrap();
    (Value::Object(system), recorder, decorated, plain)
}

#[test]
fn empty_key_fails_the_same_with_and_without_recording() {
    let (system, recorder, decorated, plain) = recording_and_plain_sites("getProperty");
    let expected = Err(CallError::Thrown(
        "IllegalArgumentException: key can't be empty".to_string(),
    ));

    let args = [system, Value::from("")];
    assert_eq!(plain.invoke(&args), expected);
    assert_eq!(decorated.invoke(&args), expected);
    assert!(recorder.observed().is_empty());
}

#[test]
fn wrapped_key_reads_the_same_with_and_without_recording() {
    let (system, recorder, decorated, plain) = recording_and_plain_sites("getProperty");

    let args = [system, Value::wrapped("os.name", ValueType::Object)];
    assert_eq!(plain.invoke(&args), Ok(Value::from("Linux")));
    assert_eq!(decorated.invoke(&args), Ok(Value::from("Linux")));
    assert_eq!(recorder.observed().len(), 1);
}

/// Recorder whose every call is refused.
struct RefusingRecorder;

impl InputRecorder for RefusingRecorder {
    fn system_property(&self, _: &str, _: Option<&str>, _: &str) -> Result<Value, CallError> {
        Err(CallError::Thrown("SecurityException".to_string()))
    }

    fn set_system_properties(&self, _: Option<&PropertyMap>, _: &str) -> Result<(), CallError> {
        Err(CallError::Thrown("SecurityException".to_string()))
    }
}

#[test]
fn recorder_errors_reach_the_caller_unchanged() {
    let store = Arc::new(PropertyStore::new([("os.name", "Linux")]));
    let system = SystemFacade::object(store.clone());
    let registry =
        InterceptorRegistry::standard(system.clone(), Arc::new(RefusingRecorder)).unwrap();
    let linker = CallSiteLinker::new(Arc::new(registry), Arc::new(DynamicLinker::new()));
    let refused = Err(CallError::Thrown("SecurityException".to_string()));

    let read = linker
        .bootstrap(&LinkRequest::method("Script1", "getProperty", Signature::generic(2)))
        .unwrap();
    assert_eq!(
        read.invoke(&[Value::Object(system.clone()), Value::from("os.name")]),
        refused
    );

    let write = linker
        .bootstrap(&LinkRequest::method("Script1", "setProperties", Signature::generic(2)))
        .unwrap();
    assert_eq!(write.invoke(&[Value::Object(system.clone()), Value::Null]), refused);
    let mut props = PropertyMap::new();
    props.insert("k".into(), Value::from("v"));
    assert_eq!(write.invoke(&[Value::Object(system), Value::Map(props)]), refused);

    // Nothing was written through.
    assert_eq!(store.get("os.name").as_deref(), Some("Linux"));
    assert_eq!(store.get("k"), None);
}
