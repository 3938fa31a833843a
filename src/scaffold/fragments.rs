//! 脚手架中的 JS/CSS 片段
//!
//! 浏览器文档和无头沙箱执行同一份故障边界、注册表和启动脚本；
//! 只有模块宿主（静态链接表 / native 函数）和失败上报通道不同。

/// 预览根节点的基础样式和诊断面板样式
pub const BASE_CSS: &str = r##"
html, body { margin: 0; padding: 0; min-height: 100%; }
body { font-family: ui-sans-serif, system-ui, -apple-system, "Segoe UI", Roboto, sans-serif; }
#root { min-height: 100vh; }
.preview-error { margin: 16px; padding: 16px 20px; border-radius: 8px; border: 1px solid #fecaca; background: #fef2f2; color: #7f1d1d; }
.preview-error-title { margin: 0 0 8px; font-size: 16px; font-weight: 600; }
.preview-error-message { margin: 0; white-space: pre-wrap; word-break: break-word; font-family: ui-monospace, SFMono-Regular, Menlo, monospace; font-size: 13px; }
"##;

/// 外部绑定表，加载器和就绪门共享
pub const BINDINGS_INIT: &str = r##"
window.__PREVIEW_BINDINGS__ = window.__PREVIEW_BINDINGS__ || {};
window.__preview = window.__preview || {};
"##;

/// 统一的失败通道：渲染边界、同步错误、未处理拒绝都进入 reportFailure
pub const FAULT: &str = r##"
(function (global) {
  var preview = global.__preview = global.__preview || {};
  var state = preview.state = { failed: false, failure: null, root: null };
  var hooks = [];

  function escapeHtml(text) {
    return String(text)
      .replace(/&/g, '&amp;')
      .replace(/</g, '&lt;')
      .replace(/>/g, '&gt;')
      .replace(/"/g, '&quot;');
  }

  function describe(err) {
    if (err === null || err === undefined) return 'Unknown error';
    if (typeof err === 'string') return err;
    if (typeof err === 'object' && typeof err.message === 'string') {
      var name = err.name && err.name !== 'Error' ? err.name + ': ' : '';
      return name + err.message;
    }
    try { return JSON.stringify(err); } catch (e) { return String(err); }
  }

  preview.escapeHtml = escapeHtml;
  preview.describe = describe;

  preview.panelHtml = function (kind, message) {
    var titles = preview.titles || {};
    var title = titles[kind] || titles.runtime || 'Error';
    return '<div class="preview-error" role="alert" data-kind="' + escapeHtml(kind) + '">' +
      '<h2 class="preview-error-title">' + escapeHtml(title) + '</h2>' +
      '<pre class="preview-error-message">' + escapeHtml(message) + '</pre>' +
      '</div>';
  };

  preview.onFailure = function (hook) { hooks.push(hook); };

  function showPanel(kind, message) {
    var el = global.document && global.document.getElementById('root');
    if (el) el.innerHTML = preview.panelHtml(kind, message);
  }

  preview.reportFailure = function (kind, err) {
    var message = describe(err);
    var terminal = !state.failed;
    for (var i = 0; i < hooks.length; i++) {
      try { hooks[i](kind, message, terminal); } catch (e) {}
    }
    if (!terminal) return;
    state.failed = true;
    state.failure = { kind: kind, message: message };
    var root = state.root;
    state.root = null;
    if (root) {
      // 渲染提交过程中不能同步卸载
      global.setTimeout(function () {
        try { root.unmount(); } catch (e) {}
        showPanel(kind, message);
      }, 0);
    } else {
      showPanel(kind, message);
    }
  };

  preview.isComponent = function (value) {
    if (typeof value === 'function') return true;
    return value !== null && typeof value === 'object' && value.$$typeof !== undefined;
  };

  preview.createBoundary = function (React) {
    function PreviewBoundary(props) {
      React.Component.call(this, props);
      this.state = { error: null };
    }
    PreviewBoundary.prototype = Object.create(React.Component.prototype);
    PreviewBoundary.prototype.constructor = PreviewBoundary;
    PreviewBoundary.displayName = 'PreviewBoundary';
    PreviewBoundary.getDerivedStateFromError = function (error) {
      return { error: error };
    };
    PreviewBoundary.prototype.componentDidCatch = function (error) {
      preview.reportFailure('runtime', error);
    };
    PreviewBoundary.prototype.render = function () {
      if (this.state.error) {
        return React.createElement('div', {
          dangerouslySetInnerHTML: { __html: preview.panelHtml('runtime', describe(this.state.error)) }
        });
      }
      return this.props.children;
    };
    return PreviewBoundary;
  };

  preview.installGlobalHandlers = function (target) {
    target.addEventListener('error', function (event) {
      var err = event && (event.error || event.message);
      preview.reportFailure('runtime', err);
      if (event && typeof event.preventDefault === 'function') event.preventDefault();
    });
    target.addEventListener('unhandledrejection', function (event) {
      preview.reportFailure('async', event && event.reason);
      if (event && typeof event.preventDefault === 'function') event.preventDefault();
    });
  };
})(typeof window !== 'undefined' ? window : globalThis);
"##;

/// 合成模块注册表：所有模块源码在创建时编译，按需执行，每个模块最多执行一次
pub const REGISTRY: &str = r##"
(function (global) {
  var preview = global.__preview;

  function fail(kind, message) {
    var err = new Error(message);
    err.previewKind = kind;
    return err;
  }
  preview.fail = fail;

  preview.asModule = function (ns) {
    if (ns && ns.__esModule) return ns;
    var out = {};
    var key;
    for (key in ns) out[key] = ns[key];
    var def = ns && ns['default'];
    if (def && (typeof def === 'object' || typeof def === 'function')) {
      for (key in def) {
        if (!(key in out)) out[key] = def[key];
      }
    }
    out.__esModule = true;
    if (!('default' in out)) out['default'] = ns;
    return out;
  };

  preview.createRegistry = function (modules, host, bindings) {
    var factories = {};
    var records = {};

    function reactBinding() {
      var react = bindings['react'];
      return react && react['default'] ? react['default'] : react;
    }

    Object.keys(modules).forEach(function (key) {
      try {
        factories[key] = new Function('exports', 'require', 'module', 'React',
          modules[key] + '\n//# sourceURL=' + key);
      } catch (e) {
        throw fail('transform', key + ': ' + preview.describe(e));
      }
    });

    function requireModule(specifier, importer) {
      var resolved = host.resolve(specifier, importer);
      if (resolved.error) throw fail('unresolved-module', resolved.error);

      if (resolved.external !== undefined) {
        var lib = bindings[resolved.external];
        if (lib === undefined) {
          throw fail('runtime', "External library '" + resolved.external + "' is not loaded");
        }
        return lib;
      }

      var key = resolved.module;
      var factory = factories[key];
      if (!factory) throw fail('unresolved-module', "Cannot find module '" + specifier + "' (requested from " + importer + ")");

      var record = records[key];
      if (!record) record = records[key] = { exports: {} };

      var step = host.begin(key);
      if (step === 'failed') throw fail('runtime', "Module '" + key + "' failed to initialize");
      if (step === 'execute') {
        try {
          factory.call(record.exports, record.exports, function (spec) {
            return requireModule(spec, key);
          }, record, reactBinding());
        } catch (e) {
          host.fail(key);
          throw e;
        }
        host.finish(key);
      }
      return record.exports;
    }

    return { require: requireModule, records: records };
  };
})(typeof window !== 'undefined' ? window : globalThis);
"##;

/// 浏览器宿主：编译期生成的链接表，失败通过 postMessage 通知父页面
pub const STATIC_HOST: &str = r##"
(function (global) {
  var preview = global.__preview;

  preview.staticHost = function (links) {
    var states = {};
    return {
      resolve: function (specifier, importer) {
        var table = links[importer] || {};
        var hit = table[specifier];
        if (hit) return hit;
        return { error: "Cannot find module '" + specifier + "' (requested from " + importer + ")" };
      },
      begin: function (key) {
        var current = states[key];
        if (!current) {
          states[key] = 'executing';
          return 'execute';
        }
        return current === 'failed' ? 'failed' : 'ready';
      },
      finish: function (key) { states[key] = 'ready'; },
      fail: function (key) { states[key] = 'failed'; }
    };
  };

  preview.createHost = function (payload) {
    return preview.staticHost(payload.links);
  };

  preview.onFailure(function (kind, message, terminal) {
    console.error('[preview] ' + kind + ': ' + message);
    try {
      if (global.parent && global.parent !== global) {
        global.parent.postMessage({ type: 'preview-error', kind: kind, message: message, terminal: terminal }, '*');
      }
    } catch (e) {}
  });

  preview.installGlobalHandlers(global);
})(window);
"##;

/// 无头宿主：模块解析和状态由 Rust 的 Resolver / ModuleRegistry 负责
pub const NATIVE_HOST: &str = r##"
(function (global) {
  var preview = global.__preview;

  preview.nativeHost = function () {
    return {
      resolve: function (specifier, importer) {
        return JSON.parse(__native_resolve(String(specifier), String(importer)));
      },
      begin: function (key) { return __native_begin(key); },
      finish: function (key) { __native_finish(key); },
      fail: function (key) { __native_fail(key); }
    };
  };

  preview.createHost = function () {
    return preview.nativeHost();
  };

  preview.onFailure(function (kind, message, terminal) {
    __native_report_failure(kind, message, terminal ? 'true' : 'false');
  });

  preview.installGlobalHandlers(global);

  global.__preview_surface = function () {
    var root = global.document.getElementById('root');
    return JSON.stringify({
      html: root ? root.innerHTML : '',
      mounted: !!preview.state.root,
      failed: preview.state.failed
    });
  };
})(globalThis);
"##;

/// 启动：编译错误直接上报；否则等待外部绑定就绪，再挂载入口组件
pub const BOOTSTRAP: &str = r##"
(function (global) {
  var preview = global.__preview;
  var payload = preview.payload;

  function missing() {
    var table = global.__PREVIEW_BINDINGS__ || {};
    return payload.required.filter(function (spec) { return table[spec] === undefined; });
  }

  function whenReady(check, options, onReady, onTimeout) {
    var attempts = 0;
    var delay = options.intervalMs;
    function poll() {
      var left = check();
      if (left.length === 0) {
        onReady();
        return;
      }
      attempts += 1;
      if (attempts >= options.maxAttempts) {
        onTimeout(left, attempts);
        return;
      }
      global.setTimeout(poll, delay);
      delay = Math.min(Math.round(delay * options.backoff), options.maxIntervalMs);
    }
    poll();
  }
  preview.whenReady = whenReady;

  function typeName(value) {
    if (value === null) return 'null';
    if (Array.isArray(value)) return 'array';
    return typeof value;
  }

  function pick(mod, name) {
    var def = mod && mod['default'];
    if (def && def[name]) return def;
    return mod;
  }

  function mount() {
    var bindings = global.__PREVIEW_BINDINGS__;
    try {
      var modules = {};
      payload.modules.forEach(function (m) { modules[m.key] = m.source; });
      var registry = preview.createRegistry(modules, preview.createHost(payload), bindings);

      var entry = registry.require(payload.entry, '<root>');
      var App = entry;
      if (entry && (entry.__esModule || entry['default'] !== undefined)) App = entry['default'];
      if (!preview.isComponent(App)) {
        throw preview.fail('missing-entry-export',
          payload.entryKey + ' must export a component as default (found ' + typeName(App) + ')');
      }

      var React = pick(bindings['react'], 'createElement');
      var client = pick(bindings['react-dom/client'], 'createRoot');
      var Boundary = preview.createBoundary(React);
      var root = client.createRoot(global.document.getElementById('root'));
      preview.state.root = root;
      root.render(React.createElement(Boundary, null, React.createElement(App)));
    } catch (e) {
      preview.reportFailure(e && e.previewKind ? e.previewKind : 'runtime', e);
    }
  }

  function start() {
    if (payload.compileError) {
      preview.reportFailure(payload.compileError.kind, payload.compileError.message);
      return;
    }
    whenReady(missing, payload.readiness, mount, function (left, attempts) {
      preview.reportFailure('readiness-timeout',
        'External libraries not ready after ' + attempts + ' attempts: ' + left.join(', '));
    });
  }

  if (global.document.readyState === 'loading') {
    global.document.addEventListener('DOMContentLoaded', start);
  } else {
    start();
  }
})(typeof window !== 'undefined' ? window : globalThis);
"##;

/// 浏览器 ESM 加载器；`__SOURCES__` 替换为说明符到地址的表
pub const BINDINGS_LOADER: &str = r##"
const sources = __SOURCES__;
const table = window.__PREVIEW_BINDINGS__;
for (const [specifier, url] of Object.entries(sources)) {
  import(url)
    .then((ns) => { table[specifier] = window.__preview.asModule(ns); })
    .catch((err) => { console.error('[preview] failed to load ' + specifier + ' from ' + url, err); });
}
"##;
