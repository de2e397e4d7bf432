//! `time.*` builtins.

use crate::args;
use crate::error::BuiltinError;
use crate::registry::{BuiltinId, BuiltinMeta, BuiltinRegistry};
use brisk_core::{TypeDesc, Value};
use chrono::Utc;
use std::time::Duration;

pub const NOW: BuiltinId = BuiltinId(400);
pub const SLEEP: BuiltinId = BuiltinId(401);

pub(crate) fn register(registry: &BuiltinRegistry) {
    registry.define(
        BuiltinMeta::function(NOW, "time.now").returns(TypeDesc::Int),
        |_, _| Ok(Value::Int(Utc::now().timestamp_millis())),
    );

    // Blocks the calling thread only.
    registry.define(
        BuiltinMeta::function(SLEEP, "time.sleep").param("ms", TypeDesc::Int),
        |_, args| {
            let ms = args::int(args, 0)?;
            let ms = u64::try_from(ms).map_err(|_| {
                BuiltinError::InvalidArgument(format!("sleep duration must be >= 0, got {}", ms))
            })?;
            std::thread::sleep(Duration::from_millis(ms));
            Ok(Value::Unit)
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use brisk_runtime::Environment;

    #[test]
    fn now_is_monotone_enough_and_sleep_validates() {
        let reg = BuiltinRegistry::new();
        register(&reg);
        let env = Environment::builder().build();

        let before = reg.call(NOW, &env, &[]).unwrap().as_int().unwrap();
        reg.call(SLEEP, &env, &[Value::Int(5)]).unwrap();
        let after = reg.call(NOW, &env, &[]).unwrap().as_int().unwrap();
        assert!(after >= before + 5, "{} -> {}", before, after);
        assert!(before > 1_600_000_000_000);

        assert!(matches!(
            reg.call(SLEEP, &env, &[Value::Int(-1)]),
            Err(BuiltinError::InvalidArgument(_))
        ));
    }
}
