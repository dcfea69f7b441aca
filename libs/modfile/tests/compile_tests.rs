use std::time::Duration;

use modfile::ir::{ConfigScalar, ConfigValue, DataType, Port};
use modfile::{compile, CompileError, ErrorCategory, GenerateError};

const FULL: &str = r#"
modfileVersion: "v1"
id: github.com/example/weather
name: Weather Station
description: Collects sensor readings
tags: [sensors, weather]
license: Apache-2.0
author: Example Org
version: v1.2.0
type: add-on
deploymentType: single
architectures: [amd64, arm64v8]
services:
  collector:
    name: Collector
    image: ghcr.io/example/collector:1.2.0
    runConfig:
      stopTimeout: 10s
      command: [collector, --verbose]
    include:
      - mountPoint: /etc/collector.yml
        source: config/collector.yml
        readOnly: true
    tmpfs:
      - mountPoint: /scratch
        size: 64Mb
    httpEndpoints:
      - name: UI
        path: /
        extPath: /ui
        port: 8080
        proxyConf:
          websocket: true
          readTimeout: 30s
    ports:
      - name: metrics
        port: 9100
        hostPort: 9100-9101
  store:
    name: Store
    image: ghcr.io/example/store:1.2.0
    requiredServices: [collector]
auxServices:
  migrate:
    name: Migrate
    runConfig:
      runOnce: true
auxImageSources: [ghcr.io/example/*]
serviceReferences:
  store:
    - refVar: STORE_ADDR
      template: "http://{ref}:8000"
      services: [collector]
      auxServices: [migrate]
volumes:
  data:
    - mountPoint: /data
      services: [store]
      auxServices: [migrate]
dependencies:
  github.com/example/broker:
    version: ">=v1.0.0"
    requiredServices:
      mqtt:
        - refVar: BROKER
          services: [collector]
hostResources:
  serial:
    tags: [usb]
    userInput:
      name: Serial device
    targets:
      - mountPoint: /dev/ttyUSB0
        services: [collector]
secrets:
  token:
    type: api-key
    targets:
      - refVar: TOKEN
        services: [collector]
configs:
  interval:
    value: 30
    dataType: int
    userInput:
      name: Poll interval
      type: number
      typeOptions:
        min: 1
    targets:
      - refVar: INTERVAL
        services: [collector]
        auxServices: [migrate]
  units:
    value: [metric]
    isList: true
    options: [metric, imperial]
    optional: true
    targets:
      - refVar: UNITS
        services: [collector]
"#;

#[test]
fn compiles_full_document() {
    let module = compile(FULL.as_bytes()).unwrap();

    assert_eq!(module.id, "github.com/example/weather");
    assert_eq!(module.module_type, "add-on");
    assert!(module.tags.contains("sensors"));
    assert_eq!(module.dependencies["github.com/example/broker"], ">=v1.0.0");
    assert!(module.volumes.contains("data"));

    let collector = &module.services["collector"];
    assert_eq!(collector.run_config.stop_timeout, Duration::from_secs(10));
    assert_eq!(collector.run_config.max_retries, 5);
    assert_eq!(collector.run_config.command, vec!["collector", "--verbose"]);
    assert!(collector.bind_mounts["/etc/collector.yml"].read_only);
    assert_eq!(collector.tmpfs["/scratch"].size, 67_108_864);
    assert_eq!(collector.tmpfs["/scratch"].mode, 0o770);
    let ui = &collector.http_endpoints["/ui"];
    assert_eq!(ui.port, Some(8080));
    assert_eq!(ui.proxy_conf.as_ref().and_then(|p| p.read_timeout), Some(Duration::from_secs(30)));
    assert_eq!(
        collector.ports,
        vec![Port {
            name: Some("metrics".into()),
            number: 9100,
            protocol: "tcp".into(),
            bindings: vec![9100, 9101],
        }]
    );
    assert_eq!(collector.srv_references["STORE_ADDR"].reference, "store");
    assert_eq!(collector.ext_dependencies["BROKER"].service, "mqtt");
    assert_eq!(collector.host_resources["/dev/ttyUSB0"].reference, "serial");
    assert_eq!(collector.secret_vars["TOKEN"].reference, "token");
    assert_eq!(collector.configs["INTERVAL"], "interval");
    assert_eq!(collector.configs["UNITS"], "units");

    let store = &module.services["store"];
    assert!(store.required_srv.contains("collector"));
    assert_eq!(store.volumes["/data"], "data");

    let migrate = &module.aux_services["migrate"];
    assert!(migrate.run_config.run_once);
    assert_eq!(migrate.volumes["/data"], "data");
    assert_eq!(migrate.configs["INTERVAL"], "interval");
    assert_eq!(migrate.srv_references["STORE_ADDR"].template.as_deref(), Some("http://{ref}:8000"));
    assert!(module.aux_img_src.contains("ghcr.io/example/*"));

    let interval = &module.configs["interval"];
    assert_eq!(interval.data_type, DataType::Int64);
    assert_eq!(interval.default, Some(ConfigValue::Scalar(ConfigScalar::Int64(30))));
    assert_eq!(interval.ui_type, "number");
    assert!(interval.required);

    let units = &module.configs["units"];
    assert!(units.is_slice && !units.required);
    assert_eq!(units.delimiter.as_deref(), Some(","));
    assert_eq!(units.options.len(), 2);

    assert_eq!(module.inputs.resources["serial"].name, "Serial device");
    assert_eq!(module.inputs.configs["interval"].name, "Poll interval");
    assert!(module.inputs.secrets.is_empty());
}

#[test]
fn compilation_is_deterministic() {
    let a = compile(FULL.as_bytes()).unwrap();
    let b = compile(FULL.as_bytes()).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_string(&a).unwrap(),
        serde_json::to_string(&b).unwrap()
    );
}

#[test]
fn config_without_default_is_required() {
    let module = compile(
        b"modfileVersion: v1\nservices:\n  svcA: {}\nconfigs:\n  cfg:\n    targets:\n      - refVar: rVar\n        services: [svcA]\n",
    )
    .unwrap();
    let cfg = &module.configs["cfg"];
    assert_eq!(cfg.data_type, DataType::String);
    assert!(cfg.required);
    assert_eq!(cfg.default, None);
    assert_eq!(module.services["svcA"].configs["rVar"], "cfg");
}

fn ports_of(spec: &str) -> Result<Vec<Port>, CompileError> {
    let doc = format!("modfileVersion: v1\nservices:\n  s:\n    ports:\n      - {spec}\n");
    compile(doc.as_bytes()).map(|m| m.services["s"].ports.clone())
}

#[test]
fn port_ranges_pair_up() {
    let ports = ports_of("{port: 80-81, hostPort: 8080-8081}").unwrap();
    assert_eq!(ports.len(), 2);
    assert_eq!(ports[0].bindings, vec![8080]);
    assert_eq!(ports[1].bindings, vec![8081]);
}

#[test]
fn single_port_binds_host_range() {
    let ports = ports_of("{port: 80, hostPort: 8080-8081}").unwrap();
    assert_eq!(ports.len(), 1);
    assert_eq!(ports[0].bindings, vec![8080, 8081]);
}

#[test]
fn more_ports_than_host_ports_is_a_range_error() {
    let err = ports_of("{port: 80-81, hostPort: 8080}").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Range);
    assert!(err.to_string().contains("range mismatch"), "{err}");
}

#[test]
fn out_of_range_port_fails_decoding() {
    let err = ports_of("{port: 70000}").unwrap_err();
    assert!(matches!(err, CompileError::Decode(_)), "got {err:?}");
}

#[test]
fn undefined_target_names_service() {
    let err = compile(
        b"modfileVersion: v1\nserviceReferences:\n  a:\n    - refVar: A\n      services: [nowhere]\n",
    )
    .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Referential);
    assert!(err.to_string().contains("'nowhere'"), "{err}");
}

#[test]
fn duplicate_bind_mount_with_other_source() {
    let err = compile(
        b"modfileVersion: v1\nservices:\n  s:\n    include:\n      - {mountPoint: /a, source: x}\n      - {mountPoint: /a, source: y}\n",
    )
    .unwrap_err();
    match err {
        CompileError::Generate(GenerateError::Service { service, .. }) => assert_eq!(service, "s"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn tmpfs_repeat_without_mode_keeps_first_mode() {
    let module = compile(
        b"modfileVersion: v1\nservices:\n  s:\n    tmpfs:\n      - {mountPoint: /t, size: 1024, mode: '0700'}\n      - {mountPoint: /t, size: 1024}\n",
    )
    .unwrap();
    assert_eq!(module.services["s"].tmpfs["/t"].mode, 0o700);
}

#[test]
fn yaml_octal_integer_mode_is_rejected() {
    let err = compile(
        b"modfileVersion: v1\nservices:\n  s:\n    tmpfs:\n      - {mountPoint: /t, size: 1024, mode: 0o770}\n",
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::Decode(_)), "got {err:?}");

    let module = compile(
        b"modfileVersion: v1\nservices:\n  s:\n    tmpfs:\n      - {mountPoint: /t, size: 1024, mode: 750}\n",
    )
    .unwrap();
    assert_eq!(module.services["s"].tmpfs["/t"].mode, 0o750);
}

#[test]
fn bad_duration_is_a_schema_error() {
    let err = compile(b"modfileVersion: v1\nservices:\n  s:\n    runConfig:\n      stopTimeout: later\n")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Schema);
}

#[test]
fn config_type_mismatch_is_a_coercion_error() {
    let err = compile(b"modfileVersion: v1\nconfigs:\n  c:\n    value: yes please\n    dataType: bool\n")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::TypeCoercion);
    assert!(err.to_string().starts_with("error parsing config 'c'"), "{err}");
}

#[test]
fn json_output_is_camel_case() {
    let module = compile(FULL.as_bytes()).unwrap();
    let json = serde_json::to_value(&module).unwrap();
    assert_eq!(json["deploymentType"], "single");
    assert_eq!(json["services"]["collector"]["runConfig"]["stopTimeout"], "10s");
    assert_eq!(json["configs"]["interval"]["default"], 30);
    assert_eq!(json["services"]["collector"]["hostResources"]["/dev/ttyUSB0"]["ref"], "serial");
}
