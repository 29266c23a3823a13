/// Archive inspection tool for native builds
#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use std::path::PathBuf;
    use std::process::ExitCode;

    use mlconsole::AppConfig;
    use mlconsole::archive::scan_archive_file;

    let config = AppConfig::load_or_default();
    mlconsole::logging::init(config.preferences.log_level.to_level_filter());

    let Some(arg) = std::env::args_os().nth(1) else {
        eprintln!("Usage: mlconsole-native <dataset.zip | --print-config>");
        return ExitCode::from(2);
    };

    if arg == "--print-config" {
        return match config.to_json() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }
    let path = PathBuf::from(arg);

    if let Ok(meta) = std::fs::metadata(&path)
        && config.is_large_archive(meta.len())
    {
        log::warn!(
            "{:?} is {} MB; uploading it from the browser may be slow",
            path,
            meta.len() / (1024 * 1024)
        );
    }

    match scan_archive_file(&path) {
        Ok(scan) => {
            println!("{:>5}  {:<32} {:>8}", "index", "class", "images");
            for class in scan.classes() {
                println!(
                    "{:>5}  {:<32} {:>8}",
                    class.index, class.name, class.image_count
                );
            }
            println!(
                "{} classes, {} images",
                scan.total_classes(),
                scan.total_images()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
