use std::process::ExitCode;

#[actix_web::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let result = match args.as_slice() {
        [command, provider, key] if command == "store-key" => {
            datatoy_lib::store_api_key(provider, key).map_err(|e| e.to_string())
        }
        [] => datatoy_lib::run().await.map_err(|e| e.to_string()),
        _ => Err("usage: datatoy [store-key <provider> <api-key>]".to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}
