use std::{
    fs,
    io::{self, Write},
    process::Command,
};

const SHADERS: [(&str, &str); 2] = [
    ("shaders/shader.vert", "target/shaders/vert.spv"),
    ("shaders/shader.frag", "target/shaders/frag.spv"),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=shaders/");

    fs::create_dir_all("target/shaders")?;

    for (source, output) in SHADERS {
        let result = match Command::new("glslc").arg(source).arg("-o").arg(output).output() {
            Ok(result) => result,
            Err(err) => {
                // the library builds without shaders, only the binary needs them at runtime
                println!("cargo:warning=glslc not available, skipping {}: {}", source, err);
                continue;
            }
        };
        io::stdout().write_all(&result.stdout)?;
        io::stderr().write_all(&result.stderr)?;
        if !result.status.success() {
            println!("cargo:warning=glslc failed to compile {}", source);
        }
    }

    Ok(())
}
