//! Injection fragments for the Pushy SDK
//!
//! Each fragment comes with the one marker used to detect it.

use serde_json::{json, Value};

/// Namespace every SDK-owned manifest declaration lives under
pub const SDK_NAMESPACE: &str = "me.pushy.sdk";

// AppDelegate.mm

pub const MODULE_IMPORT_MARKER: &str = "#import <PushyModule.h>";
pub const MODULE_IMPORT: &str = "#import <PushyModule.h>\n";

pub const LAUNCH_DECLARATION: &str = "didFinishLaunchingWithOptions";
pub const LAUNCH_MARKER: &str = "[PushyModule didFinishLaunchingWithOptions:launchOptions]";
pub const LAUNCH_CALL: &str =
    "\n  // Initialize Pushy Module\n  [PushyModule didFinishLaunchingWithOptions:launchOptions];\n";

// android/app/build.gradle

pub const DEPENDENCY_BLOCK: &str = "dependencies";
pub const SDK_DEPENDENCY_MARKER: &str = "me.pushy:sdk";
pub const SDK_DEPENDENCY: &str = "\n    implementation 'me.pushy:sdk:1.0.124'";

// Entitlements

pub const DEFAULT_APS_ENVIRONMENT: &str = "development";

// Build properties

/// Pod that needs modular headers for the SDK's MQTT transport to build
pub const MQTT_POD: &str = "MqttCocoaAsyncSocket";
pub const MODULAR_HEADERS: &str = "modular_headers";

pub fn extra_pods() -> Vec<Value> {
    vec![json!({ "name": MQTT_POD, MODULAR_HEADERS: true })]
}

// AndroidManifest.xml

pub const TOOLS_NAMESPACE: (&str, &str) = ("xmlns:tools", "http://schemas.android.com/tools");

pub const PERMISSIONS: &[&str] = &[
    "android.permission.INTERNET",
    "android.permission.WAKE_LOCK",
    "android.permission.ACCESS_NETWORK_STATE",
    "android.permission.ACCESS_WIFI_STATE",
    "android.permission.RECEIVE_BOOT_COMPLETED",
    "android.permission.VIBRATE",
    "android.permission.POST_NOTIFICATIONS",
    "android.permission.SCHEDULE_EXACT_ALARM",
];

fn receiver(name: &str, action: &str) -> Value {
    json!({
        "$": { "android:name": name, "android:exported": "false" },
        "intent-filter": [{
            "action": [{ "$": { "android:name": action } }]
        }]
    })
}

/// Push delivery, app update and boot receivers, in declaration order
pub fn receivers() -> Vec<Value> {
    vec![
        receiver("me.pushy.sdk.react.receivers.PushReceiver", "pushy.me"),
        receiver(
            "me.pushy.sdk.receivers.PushyUpdateReceiver",
            "android.intent.action.MY_PACKAGE_REPLACED",
        ),
        receiver(
            "me.pushy.sdk.receivers.PushyBootReceiver",
            "android.intent.action.BOOT_COMPLETED",
        ),
    ]
}

/// Socket and job services, in declaration order
pub fn services() -> Vec<Value> {
    vec![
        json!({
            "$": {
                "android:name": "me.pushy.sdk.services.PushySocketService",
                "android:stopWithTask": "false"
            }
        }),
        json!({
            "$": {
                "android:name": "me.pushy.sdk.services.PushyJobService",
                "android:permission": "android.permission.BIND_JOB_SERVICE",
                "android:exported": "true",
                "android:stopWithTask": "false"
            }
        }),
    ]
}
