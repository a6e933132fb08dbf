//! Constants shared across the crate.

/// Application name, used for cache directories and temp prefixes.
pub const APP_NAME: &str = "kiln";

/// Prefix under which first-party dependency outputs are placed on the classpath.
pub const USER_CLASSPATH_PREFIX: &str = "__usercp";

/// Prefix under which third-party artifacts are materialized.
pub const THIRDPARTY_CLASSPATH_PREFIX: &str = "__thirdpartycp";

/// Directory javac writes class files into.
pub const CLASSFILES_DIR: &str = "classfiles";

/// Entry point of the compiler inside the JDK.
pub const JAVAC_MAIN_CLASS: &str = "com.sun.tools.javac.Main";

/// Separator between classpath entries.
pub const CLASSPATH_SEPARATOR: &str = ":";

/// Path of the JDK wrapper script inside the toolchain image.
pub const JDK_WRAPPER_PATH: &str = "__jdk/jdk.sh";

/// Number of hex characters kept for an `ObjectHash`.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

/// 1980-01-01T00:00:00Z, the ZIP epoch. Exported to every process for reproducible timestamps.
pub const SOURCE_DATE_EPOCH: &str = "315532800";

/// Default name of the dependency resolve.
pub const DEFAULT_RESOLVE: &str = "default";

/// Suffix appended to a resolve name to locate its lockfile when none is declared.
pub const LOCKFILE_SUFFIX: &str = ".lock.json";
