use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("uavlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: uavlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("UAVLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: serial={}, cli=true", cfg!(feature = "serial"));
    println!(
        "dispatch: {}",
        uavlink_session::DISPATCH_TABLE
            .iter()
            .map(|rule| format!("{}->{}", rule.inbound, rule.outbound))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(SUCCESS)
}
