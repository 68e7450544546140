//! Test fixtures - sample recipes for pipeline tests.
//!
//! `{server}` is replaced with the mock server URI before parsing.

#![allow(dead_code)]

/// catui 0.1.3 with its three dependencies and a stub build that produces
/// one header and one shared library.
pub const CATUI_STUB: &str = r#"
name = "catui"
version = "0.1.3"
description = "IPC based application library"
license = "MIT"

[source]
archive = "{server}/gulachek/catui/archive/refs/heads/v{version}.zip"

[[dependencies]]
name = "msgstream"
version = "0.3.1"

[[dependencies]]
name = "unixsocket"
version = "0.1.0"

[[dependencies]]
name = "cjson"
version = "1.7.16"
pkg_config = "libcjson"

[build]
commands = [
    "mkdir -p build include",
    "touch build/libcatui.dylib include/foo.h",
]

[[artifacts]]
pattern = "*.h"
from = "include"
kind = "include"

[[artifacts]]
pattern = "libcatui.dylib"
from = "build"
kind = "lib"
"#;

/// No dependencies, trivial build.
pub const NO_DEPS: &str = r#"
name = "plain"
version = "1.0.0"

[source]
archive = "{server}/plain-{version}.zip"

[build]
commands = ["mkdir -p out && echo hi > out/plain.h"]

[[artifacts]]
pattern = "*.h"
from = "out"
kind = "include"
"#;

/// Build step exits non-zero after printing to both streams.
pub const FAILING_BUILD: &str = r#"
name = "broken"
version = "1.0.0"

[source]
archive = "{server}/broken-{version}.zip"

[build]
commands = ["echo compiling", "echo 'undefined symbol' >&2; exit 7"]

[[artifacts]]
pattern = "*.h"
from = "."
kind = "include"
"#;

/// Header is produced but the library never is.
pub const MISSING_LIB: &str = r#"
name = "halfbuilt"
version = "1.0.0"

[source]
archive = "{server}/halfbuilt-{version}.zip"

[build]
commands = ["mkdir -p include && touch include/half.h"]

[[artifacts]]
pattern = "*.h"
from = "include"
kind = "include"

[[artifacts]]
pattern = "libhalfbuilt.so"
from = "build"
kind = "lib"
"#;

/// Build command that checks the generated descriptor is on PKG_CONFIG_PATH.
pub const USES_PKG_CONFIG: &str = r#"
name = "consumer"
version = "1.0.0"

[source]
archive = "{server}/consumer-{version}.zip"

[[dependencies]]
name = "msgstream"
version = "0.3.1"

[build]
commands = [
    "mkdir -p build",
    "for d in $(echo $PKG_CONFIG_PATH | tr ':' ' '); do [ -f $d/msgstream.pc ] && cp $d/msgstream.pc build/found.pc; done; test -f build/found.pc",
]

[[artifacts]]
pattern = "found.pc"
from = "build"
kind = "lib"
"#;
