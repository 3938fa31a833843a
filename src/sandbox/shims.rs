//! 外部库的无头替身
//!
//! 与浏览器中同名库保持相同的导入形状。React 替身把组件树直接渲染成
//! HTML 字符串写入 `#root`，状态更新通过 `setTimeout(0)` 调度整树重渲染。
//! 替身在定义时不会发布到绑定表，只有 `__install_binding` 被调用
//! （依赖到达）时才可见。

use super::runtime::JsRuntime;
use crate::error::Result;

/// React / react-dom / react-dom/client
pub const REACT: &str = r##"
(function (global) {
  var shims = global.__preview_shims = global.__preview_shims || {};
  var assign = Object.assign;

  var ELEMENT = Symbol.for('react.element');
  var PORTAL = Symbol.for('react.portal');
  var FRAGMENT = Symbol.for('react.fragment');
  var STRICT = Symbol.for('react.strict_mode');
  var PROFILER = Symbol.for('react.profiler');
  var SUSPENSE = Symbol.for('react.suspense');
  var PROVIDER = Symbol.for('react.provider');
  var CONTEXT = Symbol.for('react.context');
  var CONSUMER = Symbol.for('react.consumer');
  var FORWARD_REF = Symbol.for('react.forward_ref');
  var MEMO = Symbol.for('react.memo');
  var LAZY = Symbol.for('react.lazy');

  // ---- 元素 ----

  function childrenProps(props, args, from) {
    var count = args.length - from;
    if (count === 1) props.children = args[from];
    else if (count > 1) props.children = Array.prototype.slice.call(args, from);
  }

  function createElement(type, config) {
    var props = {};
    var key = null;
    var ref = null;
    if (config != null) {
      if (config.key !== undefined && config.key !== null) key = String(config.key);
      if (config.ref !== undefined) ref = config.ref;
      for (var name in config) {
        if (name !== 'key' && name !== 'ref' && Object.prototype.hasOwnProperty.call(config, name)) {
          props[name] = config[name];
        }
      }
    }
    childrenProps(props, arguments, 2);
    if (type && type.defaultProps) {
      for (var d in type.defaultProps) {
        if (props[d] === undefined) props[d] = type.defaultProps[d];
      }
    }
    return { $$typeof: ELEMENT, type: type, key: key, ref: ref, props: props };
  }

  function cloneElement(element, config) {
    var props = assign({}, element.props);
    var key = element.key;
    var ref = element.ref;
    if (config != null) {
      if (config.key !== undefined) key = config.key === null ? null : String(config.key);
      if (config.ref !== undefined) ref = config.ref;
      for (var name in config) {
        if (name !== 'key' && name !== 'ref') props[name] = config[name];
      }
    }
    childrenProps(props, arguments, 2);
    return { $$typeof: ELEMENT, type: element.type, key: key, ref: ref, props: props };
  }

  function isValidElement(value) {
    return value !== null && typeof value === 'object' && value.$$typeof === ELEMENT;
  }

  function flatten(children, out) {
    if (children == null || typeof children === 'boolean') return out;
    if (Array.isArray(children)) {
      for (var i = 0; i < children.length; i++) flatten(children[i], out);
      return out;
    }
    out.push(children);
    return out;
  }

  var Children = {
    map: function (children, fn, ctx) {
      if (children == null) return children;
      return flatten(children, []).map(function (c, i) { return fn.call(ctx, c, i); });
    },
    forEach: function (children, fn, ctx) {
      flatten(children, []).forEach(function (c, i) { fn.call(ctx, c, i); });
    },
    count: function (children) { return flatten(children, []).length; },
    toArray: function (children) { return flatten(children, []); },
    only: function (children) {
      if (!isValidElement(children)) {
        throw new Error('React.Children.only expected to receive a single React element child.');
      }
      return children;
    }
  };

  // ---- 类组件 ----

  function Component(props, context) {
    this.props = props;
    this.context = context;
    this.refs = {};
  }
  Component.prototype.isReactComponent = {};
  Component.prototype.setState = function (partial, callback) {
    var self = this;
    var next = typeof partial === 'function' ? partial(self.state, self.props) : partial;
    if (next != null) self.state = assign({}, self.state, next);
    scheduleUpdate(self.__root, callback ? function () { callback.call(self); } : null);
  };
  Component.prototype.forceUpdate = function (callback) {
    var self = this;
    scheduleUpdate(self.__root, callback ? function () { callback.call(self); } : null);
  };

  function PureComponent(props, context) {
    Component.call(this, props, context);
  }
  PureComponent.prototype = Object.create(Component.prototype);
  PureComponent.prototype.constructor = PureComponent;
  PureComponent.prototype.isPureReactComponent = true;

  // ---- 其它构造 ----

  function createContext(defaultValue) {
    var context = { $$typeof: CONTEXT, _currentValue: defaultValue, _stack: [] };
    context.Provider = { $$typeof: PROVIDER, _context: context };
    context.Consumer = { $$typeof: CONSUMER, _context: context };
    return context;
  }

  function readContext(context) {
    var stack = context._stack;
    return stack.length ? stack[stack.length - 1] : context._currentValue;
  }

  function forwardRef(render) { return { $$typeof: FORWARD_REF, render: render }; }
  function memo(type, compare) { return { $$typeof: MEMO, type: type, compare: compare || null }; }
  function lazy(factory) { return { $$typeof: LAZY, _status: -1, _result: factory, _promise: null }; }

  function isThenable(value) {
    return value !== null && (typeof value === 'object' || typeof value === 'function') && typeof value.then === 'function';
  }

  function resolveLazy(type) {
    if (type._status === 1) return type._result;
    if (type._status === 2) throw type._result;
    if (type._status === -1) {
      type._status = 0;
      type._promise = Promise.resolve(type._result()).then(function (mod) {
        type._status = 1;
        type._result = mod && mod['default'] !== undefined ? mod['default'] : mod;
      }, function (err) {
        type._status = 2;
        type._result = err;
      });
    }
    throw type._promise;
  }

  // ---- Hooks ----

  var current = null;

  function hookSlot(init) {
    if (!current) {
      throw new Error('Invalid hook call. Hooks can only be called inside of the body of a function component.');
    }
    var i = current.index++;
    if (current.hooks.length <= i) current.hooks.push(init());
    return current.hooks[i];
  }

  function depsChanged(prev, next) {
    if (!prev || !next || prev.length !== next.length) return true;
    for (var i = 0; i < prev.length; i++) {
      if (!Object.is(prev[i], next[i])) return true;
    }
    return false;
  }

  function useReducer(reducer, initialArg, init) {
    var slot = hookSlot(function () {
      return { value: init ? init(initialArg) : initialArg };
    });
    slot.reducer = reducer;
    if (!slot.dispatch) {
      var root = current.root;
      slot.dispatch = function (action) {
        var next = slot.reducer(slot.value, action);
        if (Object.is(next, slot.value)) return;
        slot.value = next;
        scheduleUpdate(root);
      };
    }
    return [slot.value, slot.dispatch];
  }

  function basicReducer(state, action) {
    return typeof action === 'function' ? action(state) : action;
  }

  function useState(initial) {
    return useReducer(basicReducer, initial, function (value) {
      return typeof value === 'function' ? value() : value;
    });
  }

  function useRef(initial) {
    return hookSlot(function () { return { current: initial }; });
  }

  function useMemo(factory, deps) {
    var slot = hookSlot(function () { return { ready: false, deps: undefined, value: undefined }; });
    if (!slot.ready || depsChanged(slot.deps, deps)) {
      slot.value = factory();
      slot.deps = deps;
      slot.ready = true;
    }
    return slot.value;
  }

  function useCallback(fn, deps) {
    return useMemo(function () { return fn; }, deps);
  }

  function effectHook(queue) {
    return function (create, deps) {
      var slot = hookSlot(function () { return { effect: true, mounted: false, deps: undefined, cleanup: null }; });
      if (!slot.mounted || depsChanged(slot.deps, deps)) {
        current[queue].push({ slot: slot, create: create, deps: deps });
      }
    };
  }

  var useEffect = effectHook('effects');
  var useLayoutEffect = effectHook('layoutEffects');

  function setRef(ref, value) {
    if (typeof ref === 'function') ref(value);
    else if (ref && typeof ref === 'object') ref.current = value;
  }

  function useImperativeHandle(ref, create, deps) {
    useLayoutEffect(function () {
      setRef(ref, create());
      return function () { setRef(ref, null); };
    }, deps);
  }

  function useContext(context) {
    return readContext(context._context || context);
  }

  var nextId = 0;
  function useId() {
    return hookSlot(function () { return { value: ':r' + (nextId++).toString(36) + ':' }; }).value;
  }

  function useSyncExternalStore(subscribe, getSnapshot) {
    var value = getSnapshot();
    var root = current.root;
    useEffect(function () {
      return subscribe(function () { scheduleUpdate(root); });
    }, [subscribe]);
    return value;
  }

  function useTransition() {
    return [false, function (callback) { callback(); }];
  }

  // ---- 渲染 ----

  var VOID = { area: 1, base: 1, br: 1, col: 1, embed: 1, hr: 1, img: 1, input: 1, link: 1, meta: 1, param: 1, source: 1, track: 1, wbr: 1 };
  var ATTR_NAMES = {
    className: 'class', htmlFor: 'for', tabIndex: 'tabindex', readOnly: 'readonly', autoFocus: 'autofocus',
    autoComplete: 'autocomplete', maxLength: 'maxlength', minLength: 'minlength', colSpan: 'colspan',
    rowSpan: 'rowspan', spellCheck: 'spellcheck', contentEditable: 'contenteditable', defaultValue: 'value',
    defaultChecked: 'checked', strokeWidth: 'stroke-width', strokeLinecap: 'stroke-linecap',
    strokeLinejoin: 'stroke-linejoin', fillRule: 'fill-rule', clipRule: 'clip-rule', crossOrigin: 'crossorigin'
  };
  var SKIPPED = { children: 1, dangerouslySetInnerHTML: 1, suppressHydrationWarning: 1, suppressContentEditableWarning: 1 };
  var UNITLESS = { opacity: 1, zIndex: 1, fontWeight: 1, lineHeight: 1, flex: 1, flexGrow: 1, flexShrink: 1, order: 1, zoom: 1, gridRow: 1, gridColumn: 1, fillOpacity: 1, strokeOpacity: 1 };

  function escapeText(text) {
    return text.replace(/&/g, '&amp;').replace(/</g, '&lt;').replace(/>/g, '&gt;');
  }

  function escapeAttr(text) {
    return escapeText(text).replace(/"/g, '&quot;');
  }

  function styleString(style) {
    var out = [];
    for (var key in style) {
      var value = style[key];
      if (value == null || value === '' || typeof value === 'boolean') continue;
      var name = key.indexOf('--') === 0 ? key : key.replace(/[A-Z]/g, function (c) { return '-' + c.toLowerCase(); });
      if (typeof value === 'number' && value !== 0 && !UNITLESS[key]) value = value + 'px';
      out.push(name + ':' + value);
    }
    return out.join(';');
  }

  var typeIds = new Map();
  var nextTypeId = 0;
  function typeId(type) {
    if (typeof type === 'string') return type;
    var id = typeIds.get(type);
    if (id === undefined) {
      id = 't' + (nextTypeId++);
      typeIds.set(type, id);
    }
    return id;
  }

  function describeType(type) {
    if (type === null) return 'null';
    if (Array.isArray(type)) return 'array';
    return typeof type;
  }

  function childKey(child, index) {
    return isValidElement(child) && child.key !== null ? '$' + child.key : String(index);
  }

  function renderChildren(children, path, pass) {
    if (Array.isArray(children)) {
      var html = '';
      for (var i = 0; i < children.length; i++) {
        html += renderNode(children[i], path + '/' + childKey(children[i], i), pass);
      }
      return html;
    }
    return renderNode(children, path + '/' + childKey(children, 0), pass);
  }

  function renderNode(node, path, pass) {
    if (node == null || typeof node === 'boolean') return '';
    if (typeof node === 'string') return escapeText(node);
    if (typeof node === 'number' || typeof node === 'bigint') return String(node);
    if (Array.isArray(node)) return renderChildren(node, path, pass);
    if (typeof node === 'function' || typeof node === 'symbol') return '';
    if (node.$$typeof !== ELEMENT) {
      throw new Error('Objects are not valid as a React child (found: object with keys {' +
        Object.keys(node).join(', ') + '}). If you meant to render a collection of children, use an array instead.');
    }
    if (typeof node.type === 'string') return renderHost(node, path + ':' + node.type, pass);
    return renderType(node.type, node.props, node.ref, path + ':' + typeId(node.type), pass);
  }

  function renderType(type, props, ref, path, pass) {
    if (type === FRAGMENT || type === STRICT || type === PROFILER) {
      return renderChildren(props.children, path, pass);
    }
    if (type === SUSPENSE) return renderSuspense(props, path, pass);

    if (typeof type === 'function') {
      if (type.prototype && type.prototype.isReactComponent) return renderClass(type, props, path, pass);
      return renderFunction(type, props, ref, path, pass);
    }

    if (type !== null && typeof type === 'object') {
      switch (type.$$typeof) {
        case PROVIDER:
        case CONTEXT: {
          var context = type._context || type;
          if (type.$$typeof === CONTEXT && !('value' in props) && typeof props.children === 'function') {
            return renderChildren(props.children(readContext(context)), path, pass);
          }
          context._stack.push(props.value);
          try {
            return renderChildren(props.children, path, pass);
          } finally {
            context._stack.pop();
          }
        }
        case CONSUMER: {
          var render = props.children;
          return renderChildren(typeof render === 'function' ? render(readContext(type._context)) : null, path, pass);
        }
        case FORWARD_REF:
          return renderFunction(type.render, props, ref, path, pass);
        case MEMO:
          return renderType(type.type, props, ref, path + ':m', pass);
        case LAZY:
          return renderType(resolveLazy(type), props, ref, path + ':l', pass);
      }
    }

    throw new Error('Element type is invalid: expected a string (for built-in components) or a class/function ' +
      '(for composite components) but got: ' + describeType(type) + '. You likely forgot to export your component ' +
      "from the file it's defined in, or you might have mixed up default and named imports.");
  }

  function renderFunction(fn, props, ref, path, pass) {
    pass.seen[path] = true;
    var root = pass.root;
    var hooks = root.hooks[path] || (root.hooks[path] = []);
    var frame = { root: root, hooks: hooks, index: 0, effects: [], layoutEffects: [] };
    var previous = current;
    current = frame;
    var output;
    try {
      output = fn(props, ref);
    } finally {
      current = previous;
    }
    var html = renderChildren(output, path, pass);
    Array.prototype.push.apply(pass.layoutEffects, frame.layoutEffects);
    Array.prototype.push.apply(pass.effects, frame.effects);
    return html;
  }

  function mark(pass) {
    return { effects: pass.effects.length, layoutEffects: pass.layoutEffects.length, lifecycles: pass.lifecycles.length };
  }

  function rewind(pass, at) {
    pass.effects.length = at.effects;
    pass.layoutEffects.length = at.layoutEffects;
    pass.lifecycles.length = at.lifecycles;
  }

  function renderClass(Type, props, path, pass) {
    pass.seen[path] = true;
    var root = pass.root;
    var instance = root.instances[path];
    var context = Type.contextType ? readContext(Type.contextType) : undefined;
    var mounting = !instance;
    var prevProps = null;
    var prevState = null;

    if (mounting) {
      instance = new Type(props, context);
      if (instance.state === undefined) instance.state = null;
      instance.__root = root;
      root.instances[path] = instance;
    } else {
      prevProps = instance.props;
      prevState = instance.__committedState;
    }
    instance.props = props;
    instance.context = context;

    if (Type.getDerivedStateFromProps) {
      var derived = Type.getDerivedStateFromProps(props, instance.state);
      if (derived != null) instance.state = assign({}, instance.state, derived);
    }

    var html;
    if (Type.getDerivedStateFromError || instance.componentDidCatch) {
      var at = mark(pass);
      try {
        html = renderChildren(instance.render(), path, pass);
      } catch (error) {
        if (isThenable(error)) throw error;
        rewind(pass, at);
        if (Type.getDerivedStateFromError) {
          var recovered = Type.getDerivedStateFromError(error);
          if (recovered != null) instance.state = assign({}, instance.state, recovered);
        }
        if (instance.componentDidCatch) {
          pass.catches.push(function () { instance.componentDidCatch(error, { componentStack: '' }); });
        }
        html = renderChildren(instance.render(), path + ':recovered', pass);
      }
    } else {
      html = renderChildren(instance.render(), path, pass);
    }

    if (mounting) {
      if (instance.componentDidMount) pass.lifecycles.push(function () { instance.componentDidMount(); });
    } else if (instance.componentDidUpdate) {
      pass.lifecycles.push(function () { instance.componentDidUpdate(prevProps, prevState); });
    }
    instance.__committedState = instance.state;
    return html;
  }

  function renderSuspense(props, path, pass) {
    var at = mark(pass);
    try {
      return renderChildren(props.children, path, pass);
    } catch (thrown) {
      if (!isThenable(thrown)) throw thrown;
      rewind(pass, at);
      retryAfter(thrown, pass.root);
      return renderChildren(props.fallback, path + ':fallback', pass);
    }
  }

  function hostInstance(tag, props) {
    function noop() {}
    return {
      tagName: tag.toUpperCase(),
      id: props.id || '',
      value: props.value,
      style: {},
      focus: noop, blur: noop, click: noop, select: noop, scrollIntoView: noop, scrollTo: noop,
      addEventListener: noop, removeEventListener: noop,
      contains: function () { return false; },
      getBoundingClientRect: function () {
        return { top: 0, left: 0, right: 0, bottom: 0, width: 0, height: 0, x: 0, y: 0 };
      }
    };
  }

  function renderHost(node, path, pass) {
    var tag = node.type;
    var props = node.props;
    var target = props.id != null ? String(props.id) : (props['data-testid'] != null ? String(props['data-testid']) : null);
    var html = '<' + tag;

    for (var key in props) {
      if (SKIPPED[key]) continue;
      var value = props[key];
      if (/^on[A-Z]/.test(key)) {
        if (typeof value === 'function' && target !== null) {
          var table = pass.handlers[target] || (pass.handlers[target] = {});
          table[key.slice(2).toLowerCase()] = value;
        }
        continue;
      }
      if (value == null || typeof value === 'function' || typeof value === 'symbol') continue;
      if (key === 'style' && typeof value === 'object') {
        var css = styleString(value);
        if (css) html += ' style="' + escapeAttr(css) + '"';
        continue;
      }
      var name = ATTR_NAMES[key] || key;
      var flagged = /^(aria|data)-/.test(name);
      if (value === false) {
        if (flagged) html += ' ' + name + '="false"';
        continue;
      }
      if (value === true) {
        html += flagged ? ' ' + name + '="true"' : ' ' + name;
        continue;
      }
      html += ' ' + name + '="' + escapeAttr(String(value)) + '"';
    }

    if (node.ref) {
      var ref = node.ref;
      var instance = hostInstance(tag, props);
      pass.layoutEffects.push({ ref: ref, value: instance });
    }

    if (VOID[tag]) return html + '>';
    html += '>';
    var inner = props.dangerouslySetInnerHTML;
    if (inner && inner.__html != null) html += String(inner.__html);
    else html += renderChildren(props.children, path, pass);
    return html + '</' + tag + '>';
  }

  // ---- 根与调度 ----

  var lastRoot = null;

  function retryAfter(thenable, root) {
    var retry = function () { scheduleUpdate(root); };
    thenable.then(retry, retry);
  }

  function scheduleUpdate(root, callback) {
    if (!root || root.unmounted) return;
    if (callback) root.callbacks.push(callback);
    if (root.scheduled) return;
    root.scheduled = true;
    global.setTimeout(function () {
      root.scheduled = false;
      if (!root.unmounted) commit(root);
    }, 0);
  }

  function runEffects(list) {
    for (var i = 0; i < list.length; i++) {
      var entry = list[i];
      if (entry.ref !== undefined) {
        setRef(entry.ref, entry.value);
        continue;
      }
      var slot = entry.slot;
      if (typeof slot.cleanup === 'function') {
        var cleanup = slot.cleanup;
        slot.cleanup = null;
        cleanup();
      }
      var result = entry.create();
      slot.mounted = true;
      slot.deps = entry.deps;
      if (typeof result === 'function') slot.cleanup = result;
      else if (isThenable(result)) result.then(null, global.__dispatch_rejection);
    }
  }

  function disposeHooks(hooks) {
    for (var i = 0; i < hooks.length; i++) {
      var slot = hooks[i];
      if (slot && slot.effect && typeof slot.cleanup === 'function') {
        var cleanup = slot.cleanup;
        slot.cleanup = null;
        cleanup();
      }
    }
  }

  function unmountStale(root, seen) {
    var path;
    for (path in root.hooks) {
      if (!seen[path]) {
        disposeHooks(root.hooks[path]);
        delete root.hooks[path];
      }
    }
    for (path in root.instances) {
      if (!seen[path]) {
        var instance = root.instances[path];
        delete root.instances[path];
        if (instance.componentWillUnmount) instance.componentWillUnmount();
      }
    }
  }

  function commit(root) {
    if (root.rendering) {
      scheduleUpdate(root);
      return;
    }
    var pass = { root: root, seen: {}, handlers: {}, effects: [], layoutEffects: [], lifecycles: [], catches: [] };
    var html;
    root.rendering = true;
    try {
      html = renderNode(root.element, '0', pass);
    } catch (thrown) {
      if (isThenable(thrown)) {
        retryAfter(thrown, root);
        return;
      }
      throw thrown;
    } finally {
      root.rendering = false;
    }

    root.container.innerHTML = html;
    root.handlers = pass.handlers;
    unmountStale(root, pass.seen);

    runEffects(pass.layoutEffects);
    pass.lifecycles.forEach(function (fn) { fn(); });
    pass.catches.forEach(function (fn) { fn(); });
    runEffects(pass.effects);

    var callbacks = root.callbacks;
    root.callbacks = [];
    callbacks.forEach(function (fn) { fn(); });
  }

  function createRoot(container) {
    if (!container) throw new Error('createRoot(...): Target container is not a DOM element.');
    var root = {
      container: container,
      element: null,
      hooks: {},
      instances: {},
      handlers: {},
      callbacks: [],
      scheduled: false,
      rendering: false,
      unmounted: false
    };
    root.render = function (element) {
      root.element = element;
      if (!root.unmounted) commit(root);
    };
    root.unmount = function () {
      if (root.unmounted) return;
      root.unmounted = true;
      unmountStale(root, {});
      root.handlers = {};
      container.innerHTML = '';
    };
    lastRoot = root;
    return root;
  }

  // 合成事件：按 id / data-testid 找到处理函数
  global.__preview_fire = function (target, type, value) {
    var root = lastRoot;
    if (!root || root.unmounted) return JSON.stringify({ ok: false, error: 'Nothing is mounted' });
    var handlers = root.handlers[target];
    if (!handlers) return JSON.stringify({ ok: false, error: 'No element with id or data-testid "' + target + '"' });
    var name = String(type).replace(/^on/i, '').toLowerCase();
    var handler = handlers[name];
    if (!handler && name === 'input') handler = handlers.change;
    if (!handler && name === 'change') handler = handlers.input;
    if (!handler) return JSON.stringify({ ok: false, error: 'Element "' + target + '" has no ' + name + ' handler' });

    var el = { id: target, name: target, value: value == null ? '' : value, checked: value === true };
    var event = {
      type: name,
      target: el,
      currentTarget: el,
      key: typeof value === 'string' ? value : undefined,
      bubbles: true,
      defaultPrevented: false,
      nativeEvent: {},
      timeStamp: Date.now(),
      persist: function () {},
      stopPropagation: function () {},
      preventDefault: function () { event.defaultPrevented = true; }
    };
    global.__guard(function () { return handler(event); });
    return JSON.stringify({ ok: true });
  };

  var React = {
    Children: Children,
    Component: Component,
    PureComponent: PureComponent,
    Fragment: FRAGMENT,
    StrictMode: STRICT,
    Profiler: PROFILER,
    Suspense: SUSPENSE,
    createElement: createElement,
    cloneElement: cloneElement,
    isValidElement: isValidElement,
    createContext: createContext,
    createRef: function () { return { current: null }; },
    forwardRef: forwardRef,
    memo: memo,
    lazy: lazy,
    startTransition: function (callback) { callback(); },
    useState: useState,
    useReducer: useReducer,
    useRef: useRef,
    useMemo: useMemo,
    useCallback: useCallback,
    useEffect: useEffect,
    useLayoutEffect: useLayoutEffect,
    useInsertionEffect: useLayoutEffect,
    useImperativeHandle: useImperativeHandle,
    useContext: useContext,
    useId: useId,
    useSyncExternalStore: useSyncExternalStore,
    useTransition: useTransition,
    useDeferredValue: function (value) { return value; },
    useDebugValue: function () {},
    version: '18.3.1'
  };

  var client = {
    createRoot: createRoot,
    hydrateRoot: function (container, element) {
      var root = createRoot(container);
      root.render(element);
      return root;
    }
  };

  var dom = {
    createPortal: function (children) {
      return { $$typeof: ELEMENT, type: FRAGMENT, key: null, ref: null, props: { children: children } };
    },
    flushSync: function (fn) { return fn ? fn() : undefined; },
    render: function (element, container) {
      var root = createRoot(container);
      root.render(element);
      return root;
    },
    unmountComponentAtNode: function () { return true; },
    version: '18.3.1'
  };

  function esModule(value) {
    return assign({ __esModule: true, 'default': value }, value);
  }

  shims.__react = React;
  shims['react'] = function () { return esModule(React); };
  shims['react-dom'] = function () { return esModule(dom); };
  shims['react-dom/client'] = function () { return esModule(client); };
})(globalThis);
"##;

/// lucide-react / clsx / tailwind-merge / @headlessui/react
pub const LIBRARIES: &str = r##"
(function (global) {
  var shims = global.__preview_shims;
  var assign = Object.assign;

  // ---- clsx ----

  function toClass(value) {
    if (!value) return '';
    if (typeof value === 'string' || typeof value === 'number') return String(value);
    if (Array.isArray(value)) return value.map(toClass).filter(Boolean).join(' ');
    if (typeof value === 'object') {
      return Object.keys(value).filter(function (k) { return value[k]; }).join(' ');
    }
    return '';
  }

  function clsx() {
    return Array.prototype.map.call(arguments, toClass).filter(Boolean).join(' ');
  }

  shims['clsx'] = function () {
    return { __esModule: true, 'default': clsx, clsx: clsx };
  };

  // ---- tailwind-merge ----

  var DISPLAY = ['block', 'inline-block', 'inline', 'flex', 'inline-flex', 'grid', 'inline-grid', 'hidden', 'contents', 'table', 'flow-root'];
  var POSITION = ['static', 'fixed', 'absolute', 'relative', 'sticky'];
  var COMPOUND = ['min-w', 'max-w', 'min-h', 'max-h', 'gap-x', 'gap-y', 'space-x', 'space-y', 'inset-x', 'inset-y',
    'grid-cols', 'grid-rows', 'col-span', 'row-span', 'translate-x', 'translate-y', 'line-clamp',
    'rounded-t', 'rounded-b', 'rounded-l', 'rounded-r', 'border-t', 'border-b', 'border-l', 'border-r',
    'justify-items', 'justify-self', 'place-items', 'place-content'];
  var SIZES = /^(xs|sm|base|lg|xl|[2-9]xl)$/;
  var WEIGHTS = /^(thin|extralight|light|normal|medium|semibold|bold|extrabold|black)$/;

  function utilityGroup(utility) {
    if (DISPLAY.indexOf(utility) >= 0) return 'display';
    if (POSITION.indexOf(utility) >= 0) return 'position';
    for (var i = 0; i < COMPOUND.length; i++) {
      if (utility === COMPOUND[i] || utility.indexOf(COMPOUND[i] + '-') === 0) return COMPOUND[i];
    }
    var dash = utility.indexOf('-');
    if (dash < 0) return utility;
    var head = utility.slice(0, dash);
    var rest = utility.slice(dash + 1);
    switch (head) {
      case 'text':
        if (SIZES.test(rest)) return 'text-size';
        if (/^(left|center|right|justify|start|end)$/.test(rest)) return 'text-align';
        return 'text-color';
      case 'font':
        return WEIGHTS.test(rest) ? 'font-weight' : 'font-family';
      case 'flex':
        if (/^(row|col|row-reverse|col-reverse)$/.test(rest)) return 'flex-direction';
        if (/^(wrap|nowrap|wrap-reverse)$/.test(rest)) return 'flex-wrap';
        return 'flex';
      case 'border':
      case 'ring':
      case 'outline':
        return /^\d+$/.test(rest) ? head + '-width' : head + '-color';
      case 'bg':
        return /^(left|right|top|bottom|center|cover|contain|fixed|local|scroll|no-repeat|repeat)/.test(rest) ? 'bg-layout' : 'bg';
      default:
        return head;
    }
  }

  function conflictKey(cls) {
    var parts = cls.split(':');
    var utility = parts.pop();
    var important = '';
    if (utility.charAt(0) === '!') {
      important = '!';
      utility = utility.slice(1);
    }
    if (utility.charAt(0) === '-') utility = utility.slice(1);
    return parts.join(':') + '|' + important + utilityGroup(utility);
  }

  function twJoin() {
    return clsx.apply(null, arguments);
  }

  // 后出现的类覆盖同组的先出现的类
  function twMerge() {
    var classes = twJoin.apply(null, arguments).split(/\s+/).filter(Boolean);
    var seen = {};
    var out = [];
    for (var i = classes.length - 1; i >= 0; i--) {
      var key = conflictKey(classes[i]);
      if (seen[key]) continue;
      seen[key] = true;
      out.unshift(classes[i]);
    }
    return out.join(' ');
  }

  shims['tailwind-merge'] = function () {
    return { __esModule: true, 'default': twMerge, twMerge: twMerge, twJoin: twJoin, extendTailwindMerge: function () { return twMerge; } };
  };

  // ---- lucide-react ----

  var ICON_PROPS = { size: 1, color: 1, strokeWidth: 1, absoluteStrokeWidth: 1, className: 1, children: 1 };

  function kebab(name) {
    return name
      .replace(/Icon$/, '')
      .replace(/([a-z0-9])([A-Z])/g, '$1-$2')
      .replace(/([A-Z])([A-Z][a-z])/g, '$1-$2')
      .toLowerCase();
  }

  shims['lucide-react'] = function () {
    var React = shims.__react;
    var cache = {};

    function icon(name) {
      if (!cache[name]) {
        var slug = kebab(name);
        var Icon = React.forwardRef(function (props, ref) {
          var size = props.size != null ? props.size : 24;
          var attrs = {
            ref: ref,
            xmlns: 'http://www.w3.org/2000/svg',
            width: size,
            height: size,
            viewBox: '0 0 24 24',
            fill: 'none',
            stroke: props.color || 'currentColor',
            strokeWidth: props.strokeWidth != null ? props.strokeWidth : 2,
            strokeLinecap: 'round',
            strokeLinejoin: 'round',
            'data-icon': slug
          };
          for (var k in props) {
            if (!ICON_PROPS[k]) attrs[k] = props[k];
          }
          attrs.className = 'lucide lucide-' + slug + (props.className ? ' ' + props.className : '');
          return React.createElement('svg', attrs, props.children);
        });
        Icon.displayName = name;
        cache[name] = Icon;
      }
      return cache[name];
    }

    var module = new Proxy({}, {
      get: function (target, name) {
        if (name === '__esModule') return true;
        if (name === 'default') return module;
        if (typeof name !== 'string' || !/^[A-Z]/.test(name)) return undefined;
        return icon(name);
      },
      has: function (target, name) {
        return typeof name === 'string' && (/^[A-Z]/.test(name) || name === '__esModule' || name === 'default');
      }
    });
    return module;
  };

  // ---- @headlessui/react ----

  var HEADLESS_PROPS = ['as', 'children', 'show', 'appear', 'unmount', 'static', 'open', 'onClose', 'checked',
    'defaultChecked', 'onChange', 'value', 'defaultValue', 'by', 'multiple', 'immediate', 'enter', 'enterFrom',
    'enterTo', 'leave', 'leaveFrom', 'leaveTo', 'beforeEnter', 'afterEnter', 'beforeLeave', 'afterLeave'];

  function defaultTag(name) {
    if (name === 'Transition' || name === 'Transition.Child' || name === 'Fragment') return null;
    if (/Button$/.test(name) || name === 'Tab' || name === 'Switch') return 'button';
    if (/Title$/.test(name)) return 'h2';
    if (/Description$/.test(name)) return 'p';
    if (/(Items|Options)$/.test(name)) return 'ul';
    if (/(Item|Option)$/.test(name)) return 'li';
    if (/Label$/.test(name)) return 'label';
    if (/Input$/.test(name)) return 'input';
    return 'div';
  }

  shims['@headlessui/react'] = function () {
    var React = shims.__react;
    var cache = {};
    var renderState = { open: false, checked: false, selected: false, active: false, focus: false, disabled: false, close: function () {} };

    function part(name) {
      if (cache[name]) return cache[name];
      var tag = defaultTag(name);

      function Part(props) {
        if (props.show === false) return null;
        if (name === 'Dialog' && props.open === false) return null;
        var state = assign({}, renderState, { open: props.open === true || props.show === true, checked: props.checked === true });
        var children = typeof props.children === 'function' ? props.children(state) : props.children;
        var as = props.as !== undefined ? props.as : tag;
        if (as === null || as === React.Fragment) return React.createElement(React.Fragment, null, children);
        var rest = {};
        for (var k in props) {
          if (HEADLESS_PROPS.indexOf(k) < 0) rest[k] = props[k];
        }
        if (typeof rest.className === 'function') rest.className = rest.className(state);
        if (name === 'Switch' && props.onChange) {
          rest.onClick = function () { props.onChange(!props.checked); };
          rest.role = 'switch';
          rest['aria-checked'] = props.checked === true;
        }
        return React.createElement(as, rest, children);
      }
      Part.displayName = name;

      var proxy = new Proxy(Part, {
        get: function (target, prop) {
          if (prop in target) return target[prop];
          if (typeof prop === 'string' && /^[A-Z]/.test(prop)) return part(name + '.' + prop);
          return undefined;
        }
      });
      cache[name] = proxy;
      return proxy;
    }

    var module = new Proxy({}, {
      get: function (target, name) {
        if (name === '__esModule') return true;
        if (name === 'default') return module;
        if (typeof name !== 'string' || !/^[A-Z]/.test(name)) return undefined;
        return part(name);
      },
      has: function (target, name) {
        return typeof name === 'string' && /^[A-Z]/.test(name);
      }
    });
    return module;
  };
})(globalThis);
"##;

/// 依赖到达：把替身发布到绑定表
pub const INSTALL: &str = r##"
globalThis.__install_binding = function (specifier) {
  var factory = globalThis.__preview_shims[specifier];
  if (typeof factory !== 'function') {
    __native_console('warn', 'no headless binding for ' + specifier);
    return 'missing';
  }
  globalThis.__PREVIEW_BINDINGS__[specifier] = factory();
  return 'installed';
};
"##;

/// 定义所有替身（尚未发布）
pub fn install(rt: &JsRuntime) -> Result<()> {
    rt.eval_named("react-shim", REACT)?;
    rt.eval_named("library-shims", LIBRARIES)?;
    rt.eval_named("install-binding", INSTALL)?;
    Ok(())
}
