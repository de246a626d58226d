// Camera and gallery image sources
//
// The capture session only sees the `ImageSource` trait. On Android the
// platform source calls into the host activity over JNI and reads the files
// it hands back; other platforms report `PlatformNotSupported`.

use std::future::Future;

#[derive(Debug, Clone, PartialEq)]
pub enum PickerError {
    PermissionDenied(String),
    Timeout(String),
    Cancelled(String),
    PlatformNotSupported(String),
    Other(String),
}

impl std::fmt::Display for PickerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PickerError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            PickerError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            PickerError::Cancelled(msg) => write!(f, "Cancelled: {}", msg),
            PickerError::PlatformNotSupported(msg) => write!(f, "Platform not supported: {}", msg),
            PickerError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for PickerError {}

impl PickerError {
    /// Classifies an error message reported by the host activity
    pub fn from_host_message(message: String) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("permission") {
            PickerError::PermissionDenied(message)
        } else if lower.contains("cancel") {
            PickerError::Cancelled(message)
        } else {
            PickerError::Other(message)
        }
    }
}

/// One item of a gallery selection; reading a single picked file can fail
pub type PickedImage = Result<Vec<u8>, PickerError>;

/// Source of encoded image bytes: a device camera and a gallery picker
pub trait ImageSource: Send + Sync {
    /// Takes one photo. `Ok(None)` means the camera closed without a capture.
    fn capture(&self) -> impl Future<Output = Result<Option<Vec<u8>>, PickerError>> + Send;

    /// Lets the user pick up to `max` images
    fn pick(&self, max: usize) -> impl Future<Output = Result<Vec<PickedImage>, PickerError>> + Send;
}

const DEFAULT_MAIN_ACTIVITY_CLASS: &str = "dev/dioxus/main/MainActivity";

/// Configuration for the picker on Android
#[derive(Debug, Clone)]
pub struct AndroidPickerConfig {
    /// Fully qualified class name in slash format (e.g., "com/example/myapp/MainActivity")
    pub main_activity_class: String,
}

impl Default for AndroidPickerConfig {
    fn default() -> Self {
        Self {
            main_activity_class: DEFAULT_MAIN_ACTIVITY_CLASS.to_string(),
        }
    }
}

/// Camera and gallery of the device the app runs on
#[derive(Debug, Clone, Default)]
pub struct PlatformImageSource {
    config: AndroidPickerConfig,
}

impl PlatformImageSource {
    pub fn new(config: AndroidPickerConfig) -> Self {
        Self { config }
    }
}

impl ImageSource for PlatformImageSource {
    async fn capture(&self) -> Result<Option<Vec<u8>>, PickerError> {
        let config = self.config.clone();
        let path = tokio::task::spawn_blocking(move || platform::capture_photo(&config))
            .await
            .map_err(|e| PickerError::Other(format!("Camera task failed: {}", e)))??;

        match path {
            Some(path) => tokio::fs::read(&path)
                .await
                .map(Some)
                .map_err(|e| PickerError::Other(format!("Reading {} failed: {}", path.display(), e))),
            None => Ok(None),
        }
    }

    async fn pick(&self, max: usize) -> Result<Vec<PickedImage>, PickerError> {
        let config = self.config.clone();
        let paths = tokio::task::spawn_blocking(move || platform::pick_images(&config))
            .await
            .map_err(|e| PickerError::Other(format!("Picker task failed: {}", e)))??;

        if paths.len() > max {
            log::warn!("Picker returned {} images, at most {} allowed", paths.len(), max);
        }

        let mut picked = Vec::with_capacity(paths.len());
        for path in paths {
            picked.push(tokio::fs::read(&path).await.map_err(|e| {
                PickerError::Other(format!("Reading {} failed: {}", path.display(), e))
            }));
        }
        Ok(picked)
    }
}

#[cfg(target_os = "android")]
mod platform {
    use super::{AndroidPickerConfig, PickerError};
    use jni::objects::{JClass, JObject, JString, JValue};
    use jni::JNIEnv;
    use ndk_context::android_context;
    use std::path::PathBuf;

    /// Seconds to wait for the user before a picker call times out
    const PICKER_TIMEOUT_SECS: u64 = 60;

    fn jni_error(what: &str, e: jni::errors::Error) -> PickerError {
        PickerError::Other(format!("{} failed: {}", what, e))
    }

    fn with_env<T>(
        f: impl FnOnce(&mut JNIEnv) -> Result<T, PickerError>,
    ) -> Result<T, PickerError> {
        let vm_ptr = android_context().vm() as *mut *const jni::sys::JNIInvokeInterface_;
        let vm = unsafe { jni::JavaVM::from_raw(vm_ptr) }.map_err(|e| jni_error("JavaVM", e))?;
        let mut env = vm
            .attach_current_thread()
            .map_err(|e| jni_error("JNI attach", e))?;
        f(&mut env)
    }

    fn activity<'a>(
        env: &mut JNIEnv<'a>,
        config: &AndroidPickerConfig,
    ) -> Result<(JObject<'a>, JClass<'a>), PickerError> {
        let at_cls = env
            .find_class("android/app/ActivityThread")
            .map_err(|e| jni_error("ActivityThread lookup", e))?;
        let at = env
            .call_static_method(
                &at_cls,
                "currentActivityThread",
                "()Landroid/app/ActivityThread;",
                &[],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_error("currentActivityThread", e))?;
        let app = env
            .call_method(&at, "getApplication", "()Landroid/app/Application;", &[])
            .and_then(|v| v.l())
            .map_err(|e| jni_error("getApplication", e))?;
        let loader = env
            .call_method(&app, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])
            .and_then(|v| v.l())
            .map_err(|e| jni_error("getClassLoader", e))?;

        let name: JString = env
            .new_string(config.main_activity_class.replace('/', "."))
            .map_err(|e| jni_error("new_string", e))?;
        let cls = env
            .call_method(
                &loader,
                "loadClass",
                "(Ljava/lang/String;)Ljava/lang/Class;",
                &[JValue::Object(&JObject::from(name))],
            )
            .and_then(|v| v.l())
            .map_err(|e| jni_error("loadClass", e))?;
        let cls = JClass::from(cls);

        let signature = format!("()L{};", config.main_activity_class);
        let instance = env
            .call_static_method(&cls, "getInstance", &signature, &[])
            .and_then(|v| v.l())
            .map_err(|e| jni_error("getInstance", e))?;
        if instance.is_null() {
            return Err(PickerError::Other(
                "MainActivity instance is null - Activity not initialized?".to_string(),
            ));
        }
        Ok((instance, cls))
    }

    fn static_string(env: &mut JNIEnv, cls: &JClass, method: &str) -> Option<String> {
        let obj = env
            .call_static_method(cls, method, "()Ljava/lang/String;", &[])
            .ok()?
            .l()
            .ok()?;
        if obj.is_null() {
            return None;
        }
        env.get_string((&obj).into()).ok().map(Into::into)
    }

    /// Starts `launcher` on the activity and polls `result_getter` until the
    /// host reports a result, an error, or the timeout expires
    fn run_and_wait(
        config: &AndroidPickerConfig,
        launcher: &str,
        result_getter: &str,
    ) -> Result<String, PickerError> {
        with_env(|env| {
            let (activity, cls) = activity(env, config)?;
            env.call_static_method(&cls, "clearLastError", "()V", &[])
                .map_err(|e| jni_error("clearLastError", e))?;
            env.call_method(&activity, launcher, "()V", &[])
                .map_err(|e| jni_error(launcher, e))?;

            for _ in 0..PICKER_TIMEOUT_SECS * 10 {
                std::thread::sleep(std::time::Duration::from_millis(100));
                if let Some(result) = static_string(env, &cls, result_getter) {
                    return Ok(result);
                }
                if let Some(err) = static_string(env, &cls, "getLastError") {
                    return Err(PickerError::from_host_message(err));
                }
            }
            Err(PickerError::Timeout(format!("{} - no result", launcher)))
        })
    }

    pub fn capture_photo(config: &AndroidPickerConfig) -> Result<Option<PathBuf>, PickerError> {
        match run_and_wait(config, "launchCamera", "getLastPhotoPath") {
            Ok(path) if path.trim().is_empty() => Ok(None),
            Ok(path) => Ok(Some(PathBuf::from(path))),
            Err(PickerError::Cancelled(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn pick_images(config: &AndroidPickerConfig) -> Result<Vec<PathBuf>, PickerError> {
        let combined = run_and_wait(config, "launchImagePickerMulti", "getLastPhotoPaths")?;
        Ok(combined
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(PathBuf::from)
            .collect())
    }
}

#[cfg(not(target_os = "android"))]
mod platform {
    use super::{AndroidPickerConfig, PickerError};
    use std::path::PathBuf;

    pub fn capture_photo(_config: &AndroidPickerConfig) -> Result<Option<PathBuf>, PickerError> {
        Err(PickerError::PlatformNotSupported(
            "Camera not available on this platform".to_string(),
        ))
    }

    pub fn pick_images(_config: &AndroidPickerConfig) -> Result<Vec<PathBuf>, PickerError> {
        Err(PickerError::PlatformNotSupported(
            "Multi image picker not available on this platform".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_messages_are_classified() {
        assert!(matches!(
            PickerError::from_host_message("Camera permission denied".into()),
            PickerError::PermissionDenied(_)
        ));
        assert!(matches!(
            PickerError::from_host_message("User cancelled".into()),
            PickerError::Cancelled(_)
        ));
        assert!(matches!(
            PickerError::from_host_message("disk full".into()),
            PickerError::Other(_)
        ));
    }

    #[cfg(not(target_os = "android"))]
    #[tokio::test]
    async fn test_platform_source_is_unsupported_off_android() {
        let source = PlatformImageSource::default();
        assert!(matches!(
            source.capture().await,
            Err(PickerError::PlatformNotSupported(_))
        ));
        assert!(matches!(
            source.pick(5).await,
            Err(PickerError::PlatformNotSupported(_))
        ));
    }
}
